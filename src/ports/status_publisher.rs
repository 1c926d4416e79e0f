//! StatusPublisher port - Interface for pushing status updates to
//! waiting clients.
//!
//! Delivery is best-effort and at-most-once per connection: a
//! disconnected subscriber simply misses the push and falls back to
//! polling. Publishing lives in a separate failure domain from
//! persistence; a publish failure must never fail or retry the
//! underlying queue message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ExternalReference, Timestamp};
use crate::domain::payment::PaymentStatus;

/// Live push message delivered to subscribed connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Checkout reference the update is about.
    pub external_reference: ExternalReference,

    /// New status of the payment.
    pub status: PaymentStatus,

    /// Gateway diagnostic, when present.
    pub status_detail: Option<String>,

    /// When the status became effective.
    pub timestamp: Timestamp,
}

impl StatusUpdate {
    /// Build an update for a reference/status pair.
    pub fn new(
        external_reference: ExternalReference,
        status: PaymentStatus,
        status_detail: Option<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            external_reference,
            status,
            status_detail,
            timestamp,
        }
    }
}

/// Port for fanning a status update out to whoever is listening.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Publish an update to every connection subscribed to its
    /// reference. Publishing to a reference nobody watches is a no-op,
    /// not an error.
    async fn publish(&self, update: StatusUpdate) -> Result<(), DomainError>;
}
