//! HTTP and WebSocket surface.

mod error;
mod extractors;
pub mod rides;
pub mod ws;


pub use error::ApiError;
pub use extractors::AuthUser;
