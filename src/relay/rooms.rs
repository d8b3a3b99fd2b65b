//! Room membership
//!
//! A `Room` holds the connection ids currently joined to it. Rooms are created
//! on first join and dropped when the last member leaves. Duplicate joins are
//! a no-op.

use std::collections::{HashMap, HashSet};

use crate::client::ConnectionId;

#[derive(Debug, Default)]
pub struct Room {
    pub members: HashSet<ConnectionId>,
}

impl Room {
    pub fn join(&mut self, id: ConnectionId) {
        self.members.insert(id);
    }

    pub fn leave(&mut self, id: &ConnectionId) {
        self.members.remove(id);
    }
}

#[derive(Debug, Default)]
pub struct Rooms {
    rooms: HashMap<String, Room>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, room: &str, id: ConnectionId) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .join(id);
    }

    pub fn leave(&mut self, room: &str, id: &ConnectionId) {
        if let Some(r) = self.rooms.get_mut(room) {
            r.leave(id);
            if r.members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    /// Remove `id` from every room, returning how many rooms it left.
    pub fn leave_all(&mut self, id: &ConnectionId) -> usize {
        let mut left = 0;
        self.rooms.retain(|_, room| {
            if room.members.remove(id) {
                left += 1;
            }
            !room.members.is_empty()
        });
        left
    }

    pub fn members(&self, room: &str) -> impl Iterator<Item = &ConnectionId> {
        self.rooms.get(room).into_iter().flat_map(|r| r.members.iter())
    }

    pub fn get(&self, room: &str) -> Option<&Room> {
        self.rooms.get(room)
    }
}
