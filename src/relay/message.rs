//! Message definitions for the relay
//!
//! `ChatMessage` is the canonical internal and stored representation. Its
//! addressing is decided once, when the message is built, and carried as a
//! `Destination` so delivery never has to inspect nullable fields.
//!
//! Notes on fields:
//! - `sender`: attributed username, or `UNKNOWN_SENDER`
//! - `body`: non-blank text; blank submissions are rejected before buffering
//! - `received_at`: milliseconds since UNIX epoch, set by the relay

use serde::{Deserialize, Serialize};

/// Sender recorded when neither the connection nor the client named one.
pub const UNKNOWN_SENDER: &str = "Unknown";

pub type Username = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Destination {
    /// Every connection declared under this username.
    Direct(Username),
    /// Every connection currently joined to this room.
    Room(String),
    /// Every live connection, the sender's own included.
    Broadcast,
}

impl Destination {
    /// A non-empty target wins over a non-empty room; neither means broadcast.
    /// Names are trimmed of surrounding whitespace.
    pub fn from_parts(target: Option<&str>, room: Option<&str>) -> Self {
        let present = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (present(target), present(room)) {
            (Some(target), _) => Destination::Direct(target),
            (None, Some(room)) => Destination::Room(room),
            (None, None) => Destination::Broadcast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Username,
    pub body: String,
    pub destination: Destination,
    pub received_at: i64,
}

/// A message as submitted by a client, before validation and attribution.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub sender: Option<String>,
    pub body: Option<String>,
    pub target: Option<String>,
    pub room: Option<String>,
}

impl Submission {
    /// Convenience constructor for a message with only a body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn to_user(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn to_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn from_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}
