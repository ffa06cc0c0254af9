//! Chat protocol responses
//!
//! Literal tokens the server writes during the handshake, and the
//! announcements it broadcasts when members join or leave.

/// Sent to a peer whose credentials were accepted
pub const ACCEPTED: &[u8] = b"OK\n";

/// Sent to a peer whose credentials were rejected, right before closing
pub const REJECTED: &[u8] = b"DENIED\n";

/// Announcement broadcast when `name` joins
pub fn joined(name: &str) -> String {
    format!("{} has joined\n", name)
}

/// Announcement broadcast when `name` leaves
pub fn left(name: &str) -> String {
    format!("{} has left\n", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcements() {
        assert_eq!(joined("alice"), "alice has joined\n");
        assert_eq!(left("bob"), "bob has left\n");
    }
}
