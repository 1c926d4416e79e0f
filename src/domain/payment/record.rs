//! PaymentRecord - the authoritative record of one payment attempt.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ExternalReference, PaymentId, Timestamp, ValidationError};

use super::PaymentStatus;

/// Authoritative record of one payment attempt.
///
/// Created in `Pending` when a checkout preference is obtained from the
/// gateway; mutated only by the status processor; never physically
/// deleted (retained for audit and refund history).
///
/// # Invariant
///
/// `last_updated_at` is non-decreasing across the record's lifetime.
/// A status update carrying an older timestamp than the current record
/// must be rejected as stale, never applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Internal key.
    pub id: PaymentId,

    /// Correlates the record with the gateway checkout preference.
    pub external_reference: ExternalReference,

    /// Gateway-assigned payment id; absent until the first webhook
    /// referencing the payment arrives.
    pub external_payment_id: Option<String>,

    /// Amount in minor currency units.
    pub amount_cents: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Free-text diagnostic from the gateway (e.g. "cc_rejected_insufficient_amount").
    pub status_detail: Option<String>,

    /// When the record was created.
    pub created_at: Timestamp,

    /// Monotonic; used for stale-update ordering.
    pub last_updated_at: Timestamp,

    /// Payer email captured at checkout.
    pub payer_email: String,

    /// Opaque key/value bag (dojaang id, student id, invoice line, ...).
    pub metadata: HashMap<String, String>,
}

impl PaymentRecord {
    /// Creates a new record in `Pending` for a freshly created checkout
    /// preference.
    pub fn new_pending(
        external_reference: ExternalReference,
        amount_cents: i64,
        currency: impl Into<String>,
        payer_email: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if amount_cents <= 0 {
            return Err(ValidationError::not_positive("amount_cents", amount_cents));
        }
        let payer_email = payer_email.into();
        if payer_email.is_empty() {
            return Err(ValidationError::empty_field("payer_email"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: PaymentId::new(),
            external_reference,
            external_payment_id: None,
            amount_cents,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            status_detail: None,
            created_at: now,
            last_updated_at: now,
            payer_email,
            metadata: HashMap::new(),
        })
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns true when an update effective at `event_time` would violate
    /// the ordering invariant (strictly older than the record).
    pub fn is_stale(&self, event_time: &Timestamp) -> bool {
        event_time.is_before(&self.last_updated_at)
    }
}

/// A validated status mutation to apply to a record.
///
/// Produced by the status processor after transition validation; consumed
/// by the repository's conditional update so that concurrent consumers
/// cannot apply conflicting writes.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Record being mutated.
    pub payment_id: PaymentId,

    /// Gateway payment id learned from the event, persisted if the record
    /// does not know it yet.
    pub external_payment_id: Option<String>,

    /// Target status (already validated against the state table).
    pub new_status: PaymentStatus,

    /// Gateway diagnostic accompanying the status.
    pub status_detail: Option<String>,

    /// Provider-side timestamp of the event; becomes `last_updated_at`.
    pub effective_at: Timestamp,
}
