//! In-memory payment repository for tests and single-process runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, ExternalReference, PaymentId};
use crate::domain::payment::{PaymentRecord, StatusChange};
use crate::ports::{PaymentRepository, UpdateOutcome};

/// In-memory `PaymentRepository`.
///
/// The write lock held across compare-and-write in `update_if_newer`
/// provides the same atomicity a conditional UPDATE gives the Postgres
/// adapter.
pub struct InMemoryPaymentRepository {
    records: RwLock<HashMap<PaymentId, PaymentRecord>>,
}

impl InMemoryPaymentRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records (for test assertions).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Fetch a record by internal id (for test assertions).
    pub async fn get(&self, id: &PaymentId) -> Option<PaymentRecord> {
        self.records.read().await.get(id).cloned()
    }
}

impl Default for InMemoryPaymentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Duplicate payment id {}", record.id),
            ));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.external_payment_id.as_deref() == Some(external_payment_id))
            .cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| &r.external_reference == reference)
            .cloned())
    }

    async fn update_if_newer(&self, change: &StatusChange) -> Result<UpdateOutcome, DomainError> {
        let mut records = self.records.write().await;

        let record = match records.get_mut(&change.payment_id) {
            Some(record) => record,
            None => return Ok(UpdateOutcome::NotFound),
        };

        if change.effective_at.is_before(&record.last_updated_at) {
            return Ok(UpdateOutcome::Stale);
        }

        record.status = change.new_status;
        record.status_detail = change.status_detail.clone();
        record.last_updated_at = change.effective_at;
        if record.external_payment_id.is_none() {
            record.external_payment_id = change.external_payment_id.clone();
        }

        Ok(UpdateOutcome::Applied)
    }
}
