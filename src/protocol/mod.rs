//! Chat protocol
//!
//! Handshake parsing, payload classification, and the literal tokens the
//! server sends.

pub mod commands;
pub mod parser;
pub mod responses;

pub use commands::{EXIT_SENTINEL, Incoming, classify, trim_line_ending};
pub use parser::{Credentials, parse_credentials};
