//! # chatrelay
//!
//! `chatrelay` is the realtime core of a chat service: a WebSocket relay that
//! maps connections to declared usernames, routes each message to a single
//! user, a room, or everyone, and keeps every relayed message in an
//! in-memory buffer that is flushed to `sled` on a fixed interval. New
//! connections are sent the message history before any live traffic.
//!
//! ## Core Modules
//!
//! - `relay`: connection registry, rooms, durable buffer, replay log, the
//!   relay engine and the flush cycle.
//! - `client`: one live connection and its outbound channel.
//! - `config`: loading and merging server configuration.
//! - `persistence`: storage capabilities and the `sled` implementation.
//! - `transport`: the JSON protocol and the WebSocket server.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod persistence;
pub mod relay;
pub mod transport;
pub mod utils;
