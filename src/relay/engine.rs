//! Relay engine
//!
//! This module contains the relay responsible for:
//! - tracking live connections and the usernames they declare
//! - room membership
//! - staging every relayed message in the durable buffer and replay log
//! - routing each message to its target, its room, or everyone
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind `SharedRelay`. Every
//!   connection event and submission is one critical section, which is what
//!   keeps the registry and buffer consistent.
//! - Never hold the lock across an `.await`. The flush cycle in
//!   `relay::flush` only takes it to snapshot and to commit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::{Client, ConnectionId};
use crate::config::RelaySettings;
use crate::persistence::UserDirectory;
use crate::relay::buffer::{DurableBuffer, ReplayLog};
use crate::relay::message::{ChatMessage, Destination, Submission, UNKNOWN_SENDER};
use crate::relay::registry::Registry;
use crate::relay::rooms::Rooms;
use crate::transport::message::{ServerMessage, WireMessage};
use crate::utils::RelayError;

pub type SharedRelay = Arc<Mutex<Relay>>;

/// Lock the relay, recovering the state if a previous holder panicked.
pub fn lock_relay(relay: &SharedRelay) -> MutexGuard<'_, Relay> {
    relay.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Relay {
    pub clients: HashMap<ConnectionId, Client>,
    pub registry: Registry,
    pub rooms: Rooms,
    pub buffer: DurableBuffer,
    pub history: ReplayLog,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(&RelaySettings::default())
    }
}

impl Relay {
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            clients: HashMap::new(),
            registry: Registry::new(),
            rooms: Rooms::new(),
            buffer: DurableBuffer::new(settings.max_buffered_messages, settings.overflow_policy),
            history: ReplayLog::new(settings.history_limit),
            directory: None,
        }
    }

    /// Check declared usernames against `directory` before registering them.
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn shared(self) -> SharedRelay {
        Arc::new(Mutex::new(self))
    }

    /// Seed the replay log with previously persisted messages, oldest first.
    pub fn restore_history(&mut self, history: Vec<ChatMessage>) {
        info!("restored {} messages of history", history.len());
        self.history.seed(history);
        // keep the unflushed buffer as the newest part of the log
        for message in self.buffer.iter() {
            self.history.push(message.clone());
        }
    }

    /// History older than the buffer followed by every buffered message.
    /// The buffer is always the newest part of the replay log, but the log
    /// may be shorter than the buffer.
    pub fn backlog(&self) -> Vec<&ChatMessage> {
        let older = self.history.len().saturating_sub(self.buffer.len());
        self.history
            .iter()
            .take(older)
            .chain(self.buffer.iter())
            .collect()
    }

    /// Register a new connection and send it the backlog. The backlog is
    /// queued before the client becomes visible to any delivery, so it always
    /// precedes live traffic on that connection.
    pub fn on_connect(&mut self, client: Client) {
        let messages: Vec<WireMessage> = self.backlog().into_iter().map(WireMessage::from).collect();
        let replayed = messages.len();
        client.deliver(&ServerMessage::PreviousMessages { messages });
        debug!("{} connected, replayed {replayed} messages", client.id);
        self.clients.insert(client.id.clone(), client);
    }

    pub fn on_declare_identity(
        &mut self,
        connection_id: &ConnectionId,
        username: String,
    ) -> Result<(), RelayError> {
        if let Some(directory) = &self.directory {
            if !directory.user_exists(&username)? {
                return Err(RelayError::UnknownUser(username));
            }
        }

        if let Some(previous) = self.registry.username_of(connection_id) {
            debug!("{connection_id} re-declared identity ({previous} -> {username})");
        }
        info!("{username} is connected as {connection_id}");
        self.registry.register(connection_id.clone(), username);
        Ok(())
    }

    /// Forget a connection. Safe to call more than once.
    pub fn on_disconnect(&mut self, connection_id: &ConnectionId) {
        let was_live = self.clients.remove(connection_id).is_some();
        let username = self.registry.unregister(connection_id);
        let rooms_left = self.rooms.leave_all(connection_id);

        if was_live {
            info!(
                "{connection_id} disconnected (user: {}, rooms left: {rooms_left})",
                username.as_deref().unwrap_or("-")
            );
        }
    }

    pub fn join_room(&mut self, connection_id: &ConnectionId, room: &str) {
        self.rooms.join(room, connection_id.clone());
        debug!("{connection_id} joined room {room}");
    }

    pub fn leave_room(&mut self, connection_id: &ConnectionId, room: &str) {
        self.rooms.leave(room, connection_id);
        debug!("{connection_id} left room {room}");
    }

    /// Validate, attribute, buffer and deliver a submission from
    /// `connection_id`. Returns the number of connections it was queued for.
    pub fn on_submit(
        &mut self,
        connection_id: &ConnectionId,
        submission: Submission,
    ) -> Result<usize, RelayError> {
        let body = submission
            .body
            .filter(|b| !b.trim().is_empty())
            .ok_or(RelayError::EmptyBody)?;

        let sender = self
            .registry
            .username_of(connection_id)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or(submission.sender.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

        let message = ChatMessage {
            sender,
            body,
            destination: Destination::from_parts(
                submission.target.as_deref(),
                submission.room.as_deref(),
            ),
            received_at: Utc::now().timestamp_millis(),
        };

        self.submit(message)
    }

    /// Buffer `message` and fan it out. The message is buffered even when no
    /// live connection matches its destination.
    pub fn submit(&mut self, message: ChatMessage) -> Result<usize, RelayError> {
        self.buffer.append(message.clone())?;
        self.history.push(message.clone());

        let recipients: Vec<&Client> = match &message.destination {
            Destination::Direct(target) => self
                .registry
                .resolve(target)
                .iter()
                .filter_map(|id| self.clients.get(id))
                .collect(),
            Destination::Room(room) => self
                .rooms
                .members(room)
                .filter_map(|id| self.clients.get(id))
                .collect(),
            Destination::Broadcast => self.clients.values().collect(),
        };

        if recipients.is_empty() {
            debug!(
                "no live recipient for message from {} ({:?})",
                message.sender, message.destination
            );
            return Ok(0);
        }

        let text = match serde_json::to_string(&ServerMessage::Message(WireMessage::from(&message))) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to encode message from {}: {e}", message.sender);
                return Ok(0);
            }
        };

        let delivered = recipients
            .into_iter()
            .filter(|client| client.deliver_text(text.clone()))
            .count();
        debug!(
            "relayed message from {} to {delivered} connection(s)",
            message.sender
        );
        Ok(delivered)
    }

    /// Tell one connection why its last frame was refused.
    pub fn notify_error(&self, connection_id: &ConnectionId, error: &RelayError) {
        if let Some(client) = self.clients.get(connection_id) {
            client.deliver(&ServerMessage::Error {
                message: error.to_string(),
            });
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("clients", &self.clients.len())
            .field("registered", &self.registry.len())
            .field("buffered", &self.buffer.len())
            .field("history", &self.history.len())
            .finish()
    }
}
