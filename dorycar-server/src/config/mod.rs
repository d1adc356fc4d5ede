//! Configuration module for dorycar-server.
//!
//! Handles loading configuration from the TOML file and CLI overrides, and
//! turning it into the validated runtime types of `dorycar-core`.

pub mod file;

use crate::config::file::FileConfig;
use dorycar_core::config::{AuthConfig, ConfigStore, EngineConfig, RealtimeConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Shortest accepted HS256 key.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub auth: AuthConfig,
    pub engine: EngineConfig,
    pub realtime: RealtimeConfig,
}

/// Runtime configuration shared with request handlers.
///
/// Only the reloadable sections live here; `listen` and `realtime` are
/// fixed once the server is up.
#[derive(Clone)]
pub struct SharedConfig {
    pub auth: ConfigStore<AuthConfig>,
    pub engine: ConfigStore<EngineConfig>,
}

impl LoadedConfig {
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            auth: ConfigStore::new(self.auth),
            engine: ConfigStore::new(self.engine),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read, parse and validate the configuration file.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.parse(&config_content)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn parse(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
        return Err(ConfigError::ValidationError(format!(
            "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} characters"
        )));
    }
    if config.engine.storage_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.storage_timeout_ms must be positive".into(),
        ));
    }
    if config.engine.max_message_length == 0 {
        return Err(ConfigError::ValidationError(
            "engine.max_message_length must be positive".into(),
        ));
    }
    if config.realtime.broadcast_buffer == 0 || config.realtime.room_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "realtime buffers must be positive".into(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        listen: file_config.server.listen,
        auth: AuthConfig {
            jwt_secret: file_config.auth.jwt_secret,
        },
        engine: EngineConfig {
            storage_timeout: Duration::from_millis(file_config.engine.storage_timeout_ms),
            require_completed_ride_for_review: file_config
                .engine
                .require_completed_ride_for_review,
            max_message_length: file_config.engine.max_message_length,
        },
        realtime: RealtimeConfig {
            broadcast_buffer: file_config.realtime.broadcast_buffer,
            room_buffer: file_config.realtime.room_buffer,
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_LINE: &str = "[auth]\njwt_secret = \"0123456789abcdef0123456789abcdef\"\n";

    #[test]
    fn test_listen_override_wins() {
        let override_addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loader = ConfigLoader::new("unused.toml", Some(override_addr));
        let loaded = loader
            .parse(&format!("[server]\nlisten = \"0.0.0.0:80\"\n{SECRET_LINE}"))
            .unwrap();
        assert_eq!(loaded.listen, override_addr);
        assert_eq!(loaded.engine.storage_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let loader = ConfigLoader::new("unused.toml", None);
        let result = loader.parse("[auth]\njwt_secret = \"short\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_buffers_are_rejected() {
        let loader = ConfigLoader::new("unused.toml", None);
        let result = loader.parse(&format!("{SECRET_LINE}[realtime]\nroom_buffer = 0\n"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
