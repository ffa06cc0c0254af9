//! Client management system
//!
//! Client state, the shared registry of authenticated clients, the broadcast
//! engine on top of it, and the per-connection handler.

pub mod broadcast;
pub mod handler;
pub mod registry;
pub mod state;

pub use broadcast::BroadcastReport;
pub use handler::{
    ConnectionHandler, ConnectionState, Departure, HandlerContext, HandlerOutcome, handle_client,
};
pub use registry::{ClientRegistry, Member, Slot};
pub use state::{Client, ClientId, ClientIds};
