//! Connection registry
//!
//! Maps each live connection to the username it declared. A username may be
//! declared by several connections (multiple tabs or devices), so a reverse
//! index from username to connections is kept alongside. Both maps are
//! updated together; callers synchronize through the relay lock.

use std::collections::{BTreeSet, HashMap};

use crate::client::ConnectionId;
use crate::relay::message::Username;

#[derive(Debug, Default)]
pub struct Registry {
    by_connection: HashMap<ConnectionId, Username>,
    by_username: HashMap<Username, BTreeSet<ConnectionId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the username for `connection_id`. The last
    /// declaration for a connection wins; empty usernames are stored as-is.
    pub fn register(&mut self, connection_id: ConnectionId, username: Username) {
        if let Some(previous) = self
            .by_connection
            .insert(connection_id.clone(), username.clone())
        {
            self.detach(&previous, &connection_id);
        }
        self.by_username
            .entry(username)
            .or_default()
            .insert(connection_id);
    }

    /// Remove the mapping for `connection_id` if there is one.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<Username> {
        let username = self.by_connection.remove(connection_id)?;
        self.detach(&username, connection_id);
        Some(username)
    }

    /// All live connections declared under `username`, in sorted order.
    pub fn resolve(&self, username: &str) -> Vec<ConnectionId> {
        self.by_username
            .get(username)
            .map(|conns| conns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn username_of(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.by_connection.get(connection_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }

    fn detach(&mut self, username: &str, connection_id: &ConnectionId) {
        if let Some(conns) = self.by_username.get_mut(username) {
            conns.remove(connection_id);
            if conns.is_empty() {
                self.by_username.remove(username);
            }
        }
    }
}
