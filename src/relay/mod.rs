pub mod buffer;
pub mod engine;
pub mod flush;
pub mod message;
pub mod registry;
pub mod rooms;

pub use engine::{Relay, SharedRelay, lock_relay};
pub use flush::{FlushOutcome, flush_once, restore_history, run_flush_loop};
