//! IdempotencyStore port - Interface for tracking processed event ids.
//!
//! Payment gateways deliver webhooks at-least-once: network timeouts,
//! 5xx responses, and lost acks all trigger redelivery. The store tracks
//! every admitted `external_event_id` so duplicates are acknowledged
//! without re-entering the pipeline.
//!
//! `insert_if_absent` is the sole synchronization point between
//! concurrent webhook handlers and MUST be atomic: two simultaneous
//! deliveries of the same event may see exactly one `true`.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for tracking processed external event identifiers.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Record the event id if it has not been seen before.
    ///
    /// Returns `true` when the id was newly inserted (first delivery),
    /// `false` when it was already present (duplicate). The
    /// check-and-insert must be one atomic operation.
    async fn insert_if_absent(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Check whether an event id is already recorded.
    async fn contains(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Remove an event id.
    ///
    /// Used as compensation when admission reserved the id but failed
    /// to enqueue, so the gateway's retry is not mistaken for a
    /// duplicate.
    async fn remove(&self, event_id: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn IdempotencyStore) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn idempotency_store_is_send_sync() {
        fn check<T: IdempotencyStore>() {
            assert_send_sync::<T>();
        }
    }
}
