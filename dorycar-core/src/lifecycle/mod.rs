//! The ride state machine.
//!
//! [`transitions`] holds the pure rules: given a ride and an actor, validate
//! and mutate the document and say who must be told. [`RideEngine`] runs
//! them against storage under a per-ride lock and publishes the outcome.

mod engine;
mod error;
mod locks;
pub mod transitions;

pub use engine::RideEngine;
pub use error::{ErrorClass, RideError};
pub use locks::{KeyedGuard, KeyedLocks};
