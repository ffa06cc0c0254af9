//! Error handlers
//!
//! Reporting helpers shared by `main` and the connection handlers.

use crate::error::types::ServerError;
use log::{error, warn};
use std::io;
use std::net::SocketAddr;

/// Exit status for fatal startup failures
pub const SETUP_FAILURE_EXIT_CODE: i32 = 1;

/// Report a fatal startup error on the log and on stderr
pub fn handle_error(err: &ServerError) {
    error!("Chat server error: {}", err);
    eprintln!("ERROR: {}", err);
}

/// Log a per-connection I/O failure.
///
/// Resets and broken pipes are routine when peers vanish and are logged at
/// `warn`; everything else is an `error`.
pub fn log_io_error(context: &str, peer: SocketAddr, err: &io::Error) {
    match err.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => warn!("{} {}: {}", context, peer, err),
        _ => error!("{} {}: {}", context, peer, err),
    }
}
