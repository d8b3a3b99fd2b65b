use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

/// Opaque identifier of one live transport connection. Never persisted.
pub type ConnectionId = String;

/// A connected client as seen by the relay.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this connection (`client-<uuid>`).
    pub id: ConnectionId,

    /// Channel to push WebSocket frames to the connection's writer task.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }

    /// Serialize `event` and enqueue it without waiting.
    ///
    /// Returns `false` when the event could not be encoded or the writer task
    /// has already gone away; the caller treats both as a skipped delivery.
    pub fn deliver<T: Serialize>(&self, event: &T) -> bool {
        match serde_json::to_string(event) {
            Ok(json) => self.deliver_text(json),
            Err(e) => {
                debug!("failed to encode event for {}: {e}", self.id);
                false
            }
        }
    }

    /// Enqueue an already encoded text frame.
    pub fn deliver_text(&self, text: String) -> bool {
        match self.sender.send(WsMessage::text(text)) {
            Ok(()) => true,
            Err(e) => {
                debug!("connection {} is closed: {e}", self.id);
                false
            }
        }
    }
}
