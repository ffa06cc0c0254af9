//! Error types
//!
//! Setup errors are fatal and reach `main`. Per-connection failures stay
//! inside their handler as plain `std::io::Error` and never cross tasks.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Credential file errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("cannot read credentials file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: expected `name password`")]
    MalformedLine { line: usize },

    #[error("line {line}: field longer than {max} bytes")]
    FieldTooLong { line: usize, max: usize },

    #[error("more than {max} credential entries")]
    TooManyEntries { max: usize },
}

/// Authentication handshake errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed credential message: {0}")]
    MalformedInput(String),

    #[error("invalid credentials for user: {0}")]
    InvalidCredentials(String),
}

/// Top-level startup error
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_messages() {
        let err = CredentialError::MalformedLine { line: 4 };
        assert_eq!(err.to_string(), "line 4: expected `name password`");

        let err = CredentialError::Unreadable {
            path: PathBuf::from("users.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().starts_with("cannot read credentials file users.txt"));
    }

    #[test]
    fn test_server_error_is_transparent_for_config() {
        let err: ServerError = ConfigError::Invalid("max_clients must be greater than 0".into()).into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_clients must be greater than 0"
        );
    }
}
