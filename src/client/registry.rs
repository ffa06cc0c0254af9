//! Client registry
//!
//! Tracks authenticated clients and the write half of their connection.
//! Membership is guarded by one `tokio::sync::Mutex`; every operation holds
//! it for its whole body, including the broadcast writes in `broadcast.rs`.
//!
//! Capacity is enforced twice: a semaphore of slots is reserved at accept
//! time so unauthenticated connections count too, and `add` refuses to grow
//! the map past the same bound.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, MutexGuard, OwnedSemaphorePermit, Semaphore};

use crate::client::state::{Client, ClientId};

/// A registered client and the transport it is reached through.
pub struct Member<W> {
    client: Client,
    pub(crate) writer: W,
}

impl<W> Member<W> {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Hands the write half back, e.g. to shut it down after removal.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Capacity reservation held by a connection for its whole lifetime.
///
/// Dropping it frees the slot.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Registry for tracking active clients
pub struct ClientRegistry<W = OwnedWriteHalf> {
    members: Mutex<HashMap<ClientId, Member<W>>>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl<W> ClientRegistry<W> {
    pub fn new(capacity: usize) -> Self {
        Self {
            members: Mutex::new(HashMap::with_capacity(capacity)),
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserves a connection slot without waiting. `None` means the server is full.
    pub fn try_reserve(&self) -> Option<Slot> {
        Arc::clone(&self.slots)
            .try_acquire_owned()
            .ok()
            .map(|permit| Slot { _permit: permit })
    }

    /// Number of slots not held by any connection.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Inserts an authenticated client.
    ///
    /// Gives the writer back if the client is unauthenticated, its id is
    /// already present, or the registry is full.
    pub async fn add(&self, client: Client, writer: W) -> Result<(), W> {
        let mut members = self.members.lock().await;

        if !client.is_authenticated() {
            warn!("Refusing to register unauthenticated client {}", client);
            return Err(writer);
        }

        if members.contains_key(&client.id()) {
            warn!("Client {} is already registered", client);
            return Err(writer);
        }

        if members.len() >= self.capacity {
            warn!("Registry full ({}), dropping {}", self.capacity, client);
            return Err(writer);
        }

        debug!(
            "Registering client {} ({} already online)",
            client,
            members.len()
        );
        members.insert(client.id(), Member { client, writer });
        Ok(())
    }

    /// Removes the client with `id`. Removing an absent id is a no-op.
    pub async fn remove(&self, id: ClientId) -> Option<Member<W>> {
        let removed = self.members.lock().await.remove(&id);
        if let Some(member) = &removed {
            debug!("Deregistered client {}", member.client);
        }
        removed
    }

    /// Calls `f` for every member other than `id`, under the lock, in no
    /// particular order.
    pub async fn for_each_except<F>(&self, id: ClientId, mut f: F)
    where
        F: FnMut(&Member<W>),
    {
        let members = self.members.lock().await;
        members
            .iter()
            .filter(|(member_id, _)| **member_id != id)
            .for_each(|(_, member)| f(member));
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.members.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, Member<W>>> {
        self.members.lock().await
    }
}
