//! RAX chat server
//!
//! Clients connect over TCP, authenticate with `name password`, and every
//! non-empty read they send afterwards is relayed verbatim to all other
//! authenticated clients.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use crate::config::ServerConfig;
pub use crate::server::Server;
