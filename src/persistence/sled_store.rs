//! Persistence layer backed by `sled`
//!
//! Messages live in the `messages` tree. Keys are the zero-padded receive
//! timestamp followed by the buffer sequence number, so a scan yields arrival
//! order and re-writing a batch after an ambiguous failure overwrites the
//! same keys instead of duplicating them.
//!
//! Known usernames live in the `users` tree (key = username, empty value).
//!
//! Configuration options supported:
//! - `max_stored_messages`: optional cap; when exceeded after a write the
//!   oldest records are removed.

use std::path::Path;

use sled::{Batch, Db, Tree};
use tracing::{debug, warn};

use crate::persistence::{MessageStore, UserDirectory};
use crate::relay::buffer::Sequenced;
use crate::relay::message::ChatMessage;
use crate::utils::StoreError;

const MESSAGES_TREE: &str = "messages";
const USERS_TREE: &str = "users";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    messages: Tree,
    users: Tree,
    max_stored_messages: Option<usize>,
}

impl SledStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: impl AsRef<Path>, max_stored_messages: Option<usize>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let messages = db.open_tree(MESSAGES_TREE)?;
        let users = db.open_tree(USERS_TREE)?;
        Ok(Self {
            db,
            messages,
            users,
            max_stored_messages,
        })
    }

    /// Record `username` as a known user. Returns `false` if it already was.
    pub fn add_user(&self, username: &str) -> Result<bool, StoreError> {
        let previous = self.users.insert(username.as_bytes(), &[] as &[u8])?;
        self.users.flush()?;
        Ok(previous.is_none())
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn record_key(entry: &Sequenced) -> String {
        format!("{:020}_{:020}", entry.message.received_at, entry.seq)
    }

    fn enforce_retention(&self) -> Result<(), StoreError> {
        let Some(max) = self.max_stored_messages else {
            return Ok(());
        };

        let total = self.messages.len();
        if total <= max {
            return Ok(());
        }

        let excess = total - max;
        let keys: Vec<_> = self
            .messages
            .iter()
            .keys()
            .take(excess)
            .collect::<Result<_, _>>()?;

        let mut batch = Batch::default();
        for key in keys {
            batch.remove(key);
        }
        self.messages.apply_batch(batch)?;
        debug!("retention removed {excess} stored messages");
        Ok(())
    }
}

impl MessageStore for SledStore {
    fn persist_batch(&self, entries: &[Sequenced]) -> Result<(), StoreError> {
        let mut batch = Batch::default();
        for entry in entries {
            let value = serde_json::to_vec(&entry.message)?;
            batch.insert(Self::record_key(entry).as_bytes(), value);
        }

        self.messages.apply_batch(batch)?;
        self.enforce_retention()?;
        self.db.flush()?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ChatMessage>, StoreError> {
        let mut history = Vec::with_capacity(self.messages.len());
        for record in self.messages.iter() {
            let (key, value) = record?;
            match serde_json::from_slice::<ChatMessage>(&value) {
                Ok(message) => history.push(message),
                Err(e) => warn!(
                    "skipping unreadable stored message {}: {e}",
                    String::from_utf8_lossy(&key)
                ),
            }
        }
        Ok(history)
    }
}

impl UserDirectory for SledStore {
    fn user_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(username.as_bytes())?)
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("max_stored_messages", &self.max_stored_messages)
            .finish()
    }
}
