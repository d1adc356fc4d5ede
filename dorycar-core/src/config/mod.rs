//! Validated runtime configuration shared by the core and the server.
//!
//! Parsing the TOML file is the server's job; these are the values after
//! defaults and validation have been applied.

mod config_store;

pub use config_store::ConfigStore;

use std::time::Duration;

/// Tunables of the ride lifecycle engine. Reloadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on each storage call made by the engine.
    pub storage_timeout: Duration,
    /// Refuse reviews until the ride is completed.
    pub require_completed_ride_for_review: bool,
    /// Longest accepted chat message, in characters.
    pub max_message_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_millis(5000),
            require_completed_ride_for_review: false,
            max_message_length: 2000,
        }
    }
}

/// Token verification settings. Reloadable.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key shared with the service that issues tokens.
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

/// Channel capacities of the notification hub. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub broadcast_buffer: usize,
    pub room_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            broadcast_buffer: 256,
            room_buffer: 64,
        }
    }
}
