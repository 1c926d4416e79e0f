//! GetPaymentStatusHandler - polling read for payment status.
//!
//! The live push channel is best-effort; this read is the source of
//! truth a client falls back to after a disconnect or a missed update.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, ExternalReference, Timestamp};
use crate::domain::payment::PaymentStatus;
use crate::ports::PaymentRepository;

/// Client-facing view of a payment record.
///
/// Exposes lifecycle status only; internal pipeline state never leaks
/// to the paying user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub external_reference: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: Timestamp,
    pub last_updated_at: Timestamp,
}

/// Handler for the status polling read.
pub struct GetPaymentStatusHandler {
    repository: Arc<dyn PaymentRepository>,
}

impl GetPaymentStatusHandler {
    pub fn new(repository: Arc<dyn PaymentRepository>) -> Self {
        Self { repository }
    }

    /// Look up the current status by checkout reference.
    pub async fn handle(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<PaymentStatusView>, DomainError> {
        let record = self.repository.find_by_reference(reference).await?;

        Ok(record.map(|record| PaymentStatusView {
            external_reference: record.external_reference.to_string(),
            status: record.status,
            status_detail: record.status_detail,
            amount_cents: record.amount_cents,
            currency: record.currency,
            created_at: record.created_at,
            last_updated_at: record.last_updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryPaymentRepository;
    use crate::domain::payment::PaymentRecord;

    #[tokio::test]
    async fn returns_view_for_existing_record() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let record = PaymentRecord::new_pending(
            ExternalReference::from_string("ref-1"),
            10_000,
            "ARS",
            "a@x.com",
        )
        .unwrap();
        repository.insert(&record).await.unwrap();

        let handler = GetPaymentStatusHandler::new(repository);
        let view = handler
            .handle(&ExternalReference::from_string("ref-1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(view.external_reference, "ref-1");
        assert_eq!(view.status, PaymentStatus::Pending);
        assert_eq!(view.amount_cents, 10_000);
    }

    #[tokio::test]
    async fn returns_none_for_unknown_reference() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = GetPaymentStatusHandler::new(repository);

        let view = handler
            .handle(&ExternalReference::from_string("ref-ghost"))
            .await
            .unwrap();

        assert!(view.is_none());
    }

    #[test]
    fn view_serializes_camel_case_and_omits_missing_detail() {
        let view = PaymentStatusView {
            external_reference: "ref-1".to_string(),
            status: PaymentStatus::Pending,
            status_detail: None,
            amount_cents: 10_000,
            currency: "ARS".to_string(),
            created_at: Timestamp::from_unix_secs(1_700_000_000),
            last_updated_at: Timestamp::from_unix_secs(1_700_000_000),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["externalReference"], "ref-1");
        assert_eq!(json["status"], "pending");
        assert!(json.get("statusDetail").is_none());
        assert_eq!(json["amountCents"], 10_000);
    }
}
