//! Error types for the relay and its storage capabilities.
//!
//! `StoreError` covers every way a durable read or write can fail. Callers
//! treat all of them as transient: a failed flush is retried on the next
//! tick and a failed history load degrades to an empty replay log.
//!
//! `RelayError` is what a client-facing operation can return. Its `Display`
//! text is sent back verbatim in an `error` event, so keep it short.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Sled(#[from] sled::Error),

    #[error("failed to encode or decode a stored message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("storage write did not finish within {0:?}")]
    Timeout(Duration),

    #[error("storage task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("message body must not be empty")]
    EmptyBody,

    #[error("message buffer is full ({capacity} pending messages)")]
    BufferFull { capacity: usize },

    #[error("invalid message: {0}")]
    InvalidFrame(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
