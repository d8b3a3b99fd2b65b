//! In-memory staging for relayed messages
//!
//! `DurableBuffer` holds every message that has been relayed but not yet
//! persisted. Each entry carries a sequence number taken from a per-process
//! counter, so sequence order is arrival order. A flush works in two steps
//! that never hold the relay lock across the storage write:
//!
//! 1. `snapshot()` copies the current entries and remembers the highest
//!    sequence number in the copy;
//! 2. after a successful write, `commit()` removes every entry up to that
//!    sequence number. Entries appended while the write was in flight have
//!    higher numbers and stay put.
//!
//! A failed write skips step 2, so the whole batch is retried next tick.
//!
//! `ReplayLog` is the bounded history sent to new connections. It outlives
//! flushes and is seeded from storage at startup. Its limit may be smaller
//! than the buffer's, so the backlog tops it up with the buffer itself.

use std::collections::VecDeque;

use tracing::warn;

use crate::config::OverflowPolicy;
use crate::relay::message::ChatMessage;
use crate::utils::RelayError;

/// A buffered message and its arrival sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequenced {
    pub seq: u64,
    pub message: ChatMessage,
}

/// Messages captured by `DurableBuffer::snapshot` for one flush tick.
#[derive(Debug, Clone)]
pub struct FlushBatch {
    pub through_seq: u64,
    pub entries: Vec<Sequenced>,
}

impl FlushBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct DurableBuffer {
    entries: VecDeque<Sequenced>,
    next_seq: u64,
    capacity: usize,
    overflow: OverflowPolicy,
    dropped: u64,
}

impl DurableBuffer {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 1,
            capacity: capacity.max(1),
            overflow,
            dropped: 0,
        }
    }

    /// Append a message and return its sequence number.
    pub fn append(&mut self, message: ChatMessage) -> Result<u64, RelayError> {
        if self.entries.len() >= self.capacity {
            match self.overflow {
                OverflowPolicy::RejectNew => {
                    return Err(RelayError::BufferFull {
                        capacity: self.capacity,
                    });
                }
                OverflowPolicy::DropOldest => {
                    if let Some(evicted) = self.entries.pop_front() {
                        self.dropped += 1;
                        warn!(
                            "durable buffer full ({}), dropped unflushed message #{} from {}",
                            self.capacity, evicted.seq, evicted.message.sender
                        );
                    }
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Sequenced { seq, message });
        Ok(seq)
    }

    /// Copy everything currently buffered, or `None` when there is nothing
    /// to flush.
    pub fn snapshot(&self) -> Option<FlushBatch> {
        let last = self.entries.back()?;
        Some(FlushBatch {
            through_seq: last.seq,
            entries: self.entries.iter().cloned().collect(),
        })
    }

    /// Remove the entries a successful flush persisted. Returns how many
    /// were removed.
    pub fn commit(&mut self, batch: &FlushBatch) -> usize {
        let mut removed = 0;
        while self
            .entries
            .front()
            .is_some_and(|front| front.seq <= batch.through_seq)
        {
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of unflushed messages evicted by the drop-oldest policy.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().map(|b| &b.message)
    }
}

#[derive(Debug)]
pub struct ReplayLog {
    messages: VecDeque<ChatMessage>,
    limit: usize,
}

impl ReplayLog {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            limit,
        }
    }

    /// Replace the log with previously persisted history, oldest first.
    pub fn seed(&mut self, history: Vec<ChatMessage>) {
        self.messages = history.into();
        self.trim();
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        self.trim();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn trim(&mut self) {
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }
}
