//! Notification hub for payment-status push routing.
//!
//! Rooms are organized by external reference, allowing targeted
//! broadcast of status updates to every client waiting on a specific
//! checkout.
//!
//! # Architecture
//!
//! ```text
//! Room: ref-123         Room: ref-456
//! ├── client-a          ├── client-d
//! └── client-b          └── client-e
//! ```
//!
//! When the processor publishes an update for ref-123, only clients a
//! and b receive it. Delivery of a terminal status closes the room:
//! there is nothing further to wait for.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ExternalReference};
use crate::ports::{StatusPublisher, StatusUpdate};

/// Unique identifier for a connected client.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-reference publish/subscribe hub.
///
/// Provides:
/// - Client subscribe/unsubscribe keyed by external reference
/// - Broadcast of status updates to all subscribers of a reference
/// - Automatic room teardown once a terminal status is delivered
///
/// # Thread Safety
///
/// Uses `RwLock` for the room registry since publishes (reads) vastly
/// outnumber subscribes/unsubscribes (writes).
pub struct NotificationHub {
    /// Map of reference → broadcast sender for that room.
    rooms: RwLock<HashMap<ExternalReference, broadcast::Sender<StatusUpdate>>>,

    /// Map of client_id → reference for O(1) cleanup on disconnect.
    client_refs: RwLock<HashMap<ClientId, ExternalReference>>,

    /// Channel capacity for each room's broadcast channel.
    channel_capacity: usize,
}

impl NotificationHub {
    /// Create a hub with the specified per-room channel capacity.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_refs: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Create with default capacity (64 messages).
    ///
    /// A payment sees a handful of status changes over its lifetime, so
    /// even a slow consumer stays well inside this buffer.
    pub fn with_default_capacity() -> Self {
        Self::new(64)
    }

    /// Subscribe a client to updates for a reference.
    ///
    /// If the room doesn't exist it is created. Returns a receiver that
    /// yields every update published to the reference until the room
    /// closes (terminal status) or the subscriber is dropped.
    pub async fn subscribe(
        &self,
        reference: &ExternalReference,
        client_id: ClientId,
    ) -> broadcast::Receiver<StatusUpdate> {
        let mut rooms = self.rooms.write().await;

        let sender = rooms.entry(reference.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.client_refs
            .write()
            .await
            .insert(client_id, reference.clone());

        sender.subscribe()
    }

    /// Remove a client's subscription.
    ///
    /// If the room becomes empty it is cleaned up.
    pub async fn unsubscribe(&self, client_id: &ClientId) {
        let mut client_refs = self.client_refs.write().await;

        if let Some(reference) = client_refs.remove(client_id) {
            let rooms = self.rooms.read().await;
            if let Some(sender) = rooms.get(&reference) {
                if sender.receiver_count() == 0 {
                    drop(rooms);
                    self.rooms.write().await.remove(&reference);
                }
            }
        }
    }

    /// Count of subscribers for a specific reference.
    pub async fn subscriber_count(&self, reference: &ExternalReference) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(reference)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// All references with an open room (for monitoring/debugging).
    pub async fn active_references(&self) -> Vec<ExternalReference> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Total subscriptions across all rooms.
    pub async fn total_subscriber_count(&self) -> usize {
        self.client_refs.read().await.len()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl StatusPublisher for NotificationHub {
    async fn publish(&self, update: StatusUpdate) -> Result<(), DomainError> {
        let terminal = update.status.is_terminal();
        let reference = update.external_reference.clone();

        {
            let rooms = self.rooms.read().await;
            if let Some(sender) = rooms.get(&reference) {
                // Ignore send errors (no receivers is OK)
                let _ = sender.send(update);
            }
        }

        if terminal {
            // Dropping the sender closes every receiver after it drains,
            // which is how subscriptions end on terminal delivery.
            self.rooms.write().await.remove(&reference);
        }

        Ok(())
    }
}
