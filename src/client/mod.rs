//! The `client` module defines the relay's view of one live connection.
//!
//! A `Client` pairs an ephemeral connection id with the sending half of that
//! connection's outbound channel. The transport owns the receiving half and
//! drains it into the socket.

pub mod connection;
pub use connection::{Client, ConnectionId};
