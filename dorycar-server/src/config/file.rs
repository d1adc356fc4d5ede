//! TOML file configuration structures.
//!
//! These structs directly map to the `dorycar.toml` file format. Every
//! section except `[auth]` may be omitted.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 key shared with the service that issues access tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage_timeout_ms: u64,
    pub require_completed_ride_for_review: bool,
    pub max_message_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: 5000,
            require_completed_ride_for_review: false,
            max_message_length: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Capacity of the channel every connection listens on.
    pub broadcast_buffer: usize,
    /// Capacity of each per-user channel.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"

[engine]
storage_timeout_ms = 750
require_completed_ride_for_review = true
max_message_length = 500

[realtime]
broadcast_buffer = 1024
room_buffer = 16
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.engine.storage_timeout_ms, 750);
        assert!(config.engine.require_completed_ride_for_review);
        assert_eq!(config.engine.max_message_length, 500);
        assert_eq!(config.realtime.broadcast_buffer, 1024);
        assert_eq!(config.realtime.room_buffer, 16);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml_str = r#"
[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert_eq!(config.engine.storage_timeout_ms, 5000);
        assert!(!config.engine.require_completed_ride_for_review);
        assert_eq!(config.realtime.room_buffer, 64);
    }

    #[test]
    fn test_missing_auth_section_is_an_error() {
        assert!(toml::from_str::<FileConfig>("[server]\nlisten = \"0.0.0.0:1\"\n").is_err());
    }
}
