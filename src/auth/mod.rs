//! Authentication system
//!
//! Holds the credential store and validates handshake messages against it.

pub mod credentials;
pub mod validator;

pub use credentials::{Credential, CredentialStore};
pub use validator::{is_valid_field, validate_login};
