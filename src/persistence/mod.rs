//! The `persistence` module provides the durable storage the relay depends on.
//!
//! The relay only needs three capabilities, expressed as traits so tests and
//! alternative backends can stand in for the embedded store:
//!
//! - `MessageStore::persist_batch`: atomically append one flush batch
//! - `MessageStore::load_all`: read back every stored message in arrival order
//! - `UserDirectory::user_exists`: check a declared identity
//!
//! `sled_store::SledStore` implements all of them on top of `sled`.

pub mod sled_store;

pub use sled_store::SledStore;

use crate::relay::buffer::Sequenced;
use crate::relay::message::ChatMessage;
use crate::utils::StoreError;

/// Durable append-only message storage.
///
/// Implementations are called from blocking threads, never from the async
/// runtime directly.
pub trait MessageStore: Send + Sync + 'static {
    /// Store every entry or none of them. Writing the same entries again must
    /// not create duplicates.
    fn persist_batch(&self, batch: &[Sequenced]) -> Result<(), StoreError>;

    /// Every stored message, oldest first.
    fn load_all(&self) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Lookup of registered usernames.
pub trait UserDirectory: Send + Sync + 'static {
    fn user_exists(&self, username: &str) -> Result<bool, StoreError>;
}
