//! Configuration management for the RAX chat server
//!
//! Values are layered: built-in defaults, then an optional `config.toml`
//! in the working directory, then `RAX_CHAT_*` environment variables.
//! The listening port is not part of the file; it comes from the command line.

use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config";
const ENV_PREFIX: &str = "RAX_CHAT";

/// Complete server configuration, loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the listener binds to (loopback unless overridden)
    pub bind_address: String,

    /// Capacity: maximum simultaneous connections, authenticated or not
    /// Environment: RAX_CHAT_MAX_CLIENTS
    pub max_clients: usize,

    /// Bytes read from a peer per receive call
    pub buffer_size: usize,

    /// Pause between accept iterations, in milliseconds
    pub accept_delay_ms: u64,

    // ═══ AUTHENTICATION ═══
    /// Maximum length in bytes of a name or a password
    pub max_field_length: usize,

    /// Path of the `name password` credentials file
    pub credentials_path: PathBuf,

    /// Maximum number of entries the credentials file may hold
    pub max_credentials: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            max_clients: 10,
            buffer_size: 1024,
            accept_delay_ms: 1000,
            max_field_length: 31,
            credentials_path: PathBuf::from("users.txt"),
            max_credentials: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `config.toml` (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from the given file stem, which may be absent.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::Invalid("bind_address cannot be empty".into()));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Invalid(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_clients > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "max_clients must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.max_field_length == 0 {
            return Err(ConfigError::Invalid(
                "max_field_length must be greater than 0".into(),
            ));
        }

        if self.max_credentials == 0 {
            return Err(ConfigError::Invalid(
                "max_credentials must be greater than 0".into(),
            ));
        }

        if self.credentials_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "credentials_path cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a socket address string
    pub fn listen_socket(&self, port: u16) -> String {
        format!("{}:{}", self.bind_address, port)
    }

    /// Get the accept throttle as a Duration
    pub fn accept_delay(&self) -> Duration {
        Duration::from_millis(self.accept_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.max_field_length, 31);
        assert_eq!(config.listen_socket(7000), "127.0.0.1:7000");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ServerConfig {
            max_clients: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let config = ServerConfig {
            max_clients: usize::MAX,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ServerConfig {
            max_clients: Semaphore::MAX_PERMITS,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.toml");
        std::fs::write(&path, "max_clients = 3\naccept_delay_ms = 0\n").unwrap();

        let stem = dir.path().join("chat");
        let config = ServerConfig::load_from(stem.to_str().unwrap()).unwrap();

        assert_eq!(config.max_clients, 3);
        assert_eq!(config.accept_delay(), Duration::ZERO);
        assert_eq!(config.buffer_size, 1024);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("absent");
        let config = ServerConfig::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
    }
}
