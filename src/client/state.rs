//! Module `state`
//!
//! Defines the `Client` struct: the identity, peer address, and display name
//! of one accepted connection.

use std::fmt;
use std::net::SocketAddr;

/// Process-unique client identifier, assigned monotonically at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out identifiers that are never reused while the process runs.
#[derive(Debug)]
pub struct ClientIds {
    next: u64,
}

impl ClientIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> ClientId {
        let id = ClientId(self.next);
        self.next += 1;
        id
    }
}

impl Default for ClientIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents one accepted chat connection.
///
/// The name stays unset until the handshake succeeds and cannot change after.
#[derive(Debug, Clone)]
pub struct Client {
    id: ClientId,
    addr: SocketAddr,
    name: Option<String>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            name: None,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Returns the peer address captured at accept time.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the display name once authenticated.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Sets the display name after a successful handshake.
    ///
    /// Returns `false` and leaves the client untouched if a name is already set.
    pub fn set_name(&mut self, name: String) -> bool {
        if self.name.is_some() {
            return false;
        }
        self.name = Some(name);
        true
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {} ({})", self.id, name, self.addr),
            None => write!(f, "{} ({})", self.id, self.addr),
        }
    }
}
