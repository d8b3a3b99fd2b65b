//! The `transport` module is responsible for network communication with
//! clients over WebSockets.
//!
//! It defines the JSON protocol spoken between clients and the relay and
//! implements the WebSocket server that feeds connection events and
//! submissions into the relay.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, ServerMessage, WireMessage};
pub use websocket::{serve, start_websocket_server};
