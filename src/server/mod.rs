//! Server core functionality
//!
//! The accept loop: capacity check, client id assignment, and supervision of
//! one handler task per connection.

pub mod core;

pub use self::core::Server;
