//! PaymentRepository port - Interface for payment record persistence.
//!
//! The repository is the single synchronization point for concurrent
//! status consumers: `update_if_newer` must be implemented as one
//! conditional write (compare-and-swap on `last_updated_at` or an
//! equivalent row-level lock), never as read-then-write.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ExternalReference};
use crate::domain::payment::{PaymentRecord, StatusChange};

/// Result of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The change was persisted.
    Applied,

    /// The record already carries a newer `last_updated_at`; nothing
    /// was written. Losing a CAS race lands here too.
    Stale,

    /// No record matched the change's payment id.
    NotFound,
}

/// Port for storing and retrieving payment records.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a freshly created record.
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    /// Find a record by the gateway-assigned payment id.
    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Find a record by its checkout reference.
    async fn find_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Apply a status change if and only if the record's
    /// `last_updated_at` is not newer than the change's `effective_at`.
    ///
    /// Implementations MUST make the comparison and the write one atomic
    /// operation; this is what keeps competing consumers from applying
    /// conflicting writes.
    async fn update_if_newer(&self, change: &StatusChange) -> Result<UpdateOutcome, DomainError>;
}
