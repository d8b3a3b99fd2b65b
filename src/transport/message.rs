use serde::{Deserialize, Serialize};

use crate::relay::message::{ChatMessage, Destination};

/// JSON frames a client may send.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "set-username")]
    SetUsername { username: String },

    #[serde(rename = "join-room")]
    JoinRoom { room: String },

    #[serde(rename = "leave-room")]
    LeaveRoom { room: String },

    #[serde(rename = "msg-event")]
    Submit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
}

/// JSON frames the relay sends. The backlog and live traffic use distinct
/// event names so a client can tell them apart.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "previous-messages")]
    PreviousMessages { messages: Vec<WireMessage> },

    #[serde(rename = "msg-event")]
    Message(WireMessage),

    #[serde(rename = "error")]
    Error { message: String },
}

/// A chat message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WireMessage {
    pub sender: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub timestamp: i64,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        let (target, room) = match &msg.destination {
            Destination::Direct(user) => (Some(user.clone()), None),
            Destination::Room(room) => (None, Some(room.clone())),
            Destination::Broadcast => (None, None),
        };
        Self {
            sender: msg.sender.clone(),
            message: msg.body.clone(),
            target,
            room,
            timestamp: msg.received_at,
        }
    }
}
