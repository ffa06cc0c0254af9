//! Authentication validator
//!
//! Checks the handshake message a new peer sends and looks the pair up in
//! the credential store.

use super::credentials::CredentialStore;
use crate::error::AuthError;
use crate::protocol::parse_credentials;

/// Basic input sanitation for a name or password.
pub fn is_valid_field(input: &str, max_length: usize) -> bool {
    !input.is_empty() && input.len() <= max_length && !input.contains('\0')
}

/// Validates a raw credential message and returns the authenticated name.
pub fn validate_login(
    store: &CredentialStore,
    message: &[u8],
    max_field_length: usize,
) -> Result<String, AuthError> {
    let creds = parse_credentials(message)
        .ok_or_else(|| AuthError::MalformedInput("expected `name password`".into()))?;

    if !is_valid_field(creds.name, max_field_length) {
        return Err(AuthError::MalformedInput("invalid name".into()));
    }

    if !is_valid_field(creds.password, max_field_length) {
        return Err(AuthError::MalformedInput("invalid password".into()));
    }

    if store.authenticate(creds.name, creds.password) {
        Ok(creds.name.to_string())
    } else {
        Err(AuthError::InvalidCredentials(creds.name.to_string()))
    }
}
