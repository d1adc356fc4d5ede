//! Real-time fan-out of ride changes.
//!
//! # Delivery model
//!
//! 1. Every committed mutation broadcasts `RideUpdated` with the public ride
//!    view to all connected clients, so list views can refresh.
//! 2. Targeted notifications and chat go to private rooms keyed by user id.
//!    A user with no open connection has no room and the event is dropped;
//!    the ride's notification log is the catch-up path.
//!
//! Delivery is fire-and-forget and never fails the operation that caused it.

mod fanout;
mod hub;
pub mod notices;
mod types;

pub use fanout::FanOut;
pub use hub::{EventSink, Hub};
pub use types::{Delivery, RideEvent};
