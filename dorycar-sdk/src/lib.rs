//! Shared wire types for the Dorycar ride server.
//!
//! The `objects` module is what the server serializes and what clients
//! deserialize. The `client` module (behind the `client` feature) wraps the
//! HTTP actions and the real-time channel.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
