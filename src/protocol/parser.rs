//! Credential message parsing
//!
//! The first read from a new peer carries `name password`, separated by
//! whitespace. Field validation lives in `auth::validator`.

/// Name and password borrowed from the handshake buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub name: &'a str,
    pub password: &'a str,
}

/// Splits a credential message into its two tokens.
///
/// Returns `None` unless the buffer is UTF-8 and holds exactly two
/// whitespace-separated tokens.
pub fn parse_credentials(buf: &[u8]) -> Option<Credentials<'_>> {
    let text = std::str::from_utf8(buf).ok()?;
    let mut parts = text.split_whitespace();
    let name = parts.next()?;
    let password = parts.next()?;

    if parts.next().is_some() {
        return None;
    }

    Some(Credentials { name, password })
}
