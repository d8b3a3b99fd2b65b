//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `chatrelay` application.
//!
//! This module centralizes the error types shared by the relay, the storage
//! layer and the transport, plus tracing initialisation for the binary.

pub mod error;
pub mod logging;

pub use error::{RelayError, StoreError};
