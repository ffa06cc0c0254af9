//! Module `commands`
//!
//! Classifies what an authenticated peer sent in one read: either the exit
//! sentinel or a chat payload to relay.

/// Payload that means "this client is leaving"
pub const EXIT_SENTINEL: &[u8] = b"exit";

/// A single non-empty read from an authenticated peer.
#[derive(Debug, PartialEq, Eq)]
pub enum Incoming<'a> {
    /// The peer asked to leave
    Exit,
    /// Bytes to broadcast verbatim
    Chat(&'a [u8]),
}

/// Strips one trailing `\n` or `\r\n`, if present.
pub fn trim_line_ending(buf: &[u8]) -> &[u8] {
    buf.strip_suffix(b"\r\n")
        .or_else(|| buf.strip_suffix(b"\n"))
        .unwrap_or(buf)
}

/// Classifies a read of non-zero length.
///
/// Only `exit` (optionally followed by one line terminator) is the sentinel.
/// Anything else, whitespace-only reads included, is chat.
pub fn classify(buf: &[u8]) -> Incoming<'_> {
    if trim_line_ending(buf) == EXIT_SENTINEL {
        Incoming::Exit
    } else {
        Incoming::Chat(buf)
    }
}
