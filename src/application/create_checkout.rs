//! CreateCheckoutHandler - Command handler for starting a checkout flow.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, ExternalReference, ValidationError};
use crate::domain::payment::PaymentRecord;
use crate::ports::{CreatePreferenceRequest, GatewayClient, GatewayError, PaymentRepository};

/// Command to create a checkout preference.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    /// Amount in minor currency units.
    pub amount_cents: i64,

    /// Purchase description shown at checkout.
    pub description: String,

    /// Payer email for gateway pre-fill.
    pub payer_email: String,
}

/// Result of a successful checkout creation.
#[derive(Debug, Clone)]
pub struct CheckoutCreated {
    /// URL the paying user is redirected to.
    pub checkout_url: String,

    /// Reference the client uses to subscribe for and poll status.
    pub external_reference: ExternalReference,
}

/// Errors from checkout creation.
#[derive(Debug, Error)]
pub enum CreateCheckoutError {
    /// Input failed validation; nothing was sent to the gateway.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The gateway call failed. `retryable` on the inner error tells the
    /// caller whether another attempt is worthwhile. No record was created.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The record could not be persisted after the preference was created.
    #[error("Repository error: {0}")]
    Repository(#[from] DomainError),
}

/// Handler for creating a checkout preference and its pending record.
pub struct CreateCheckoutHandler {
    gateway: Arc<dyn GatewayClient>,
    repository: Arc<dyn PaymentRepository>,
    currency: String,
    notification_url: Option<String>,
}

impl CreateCheckoutHandler {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        repository: Arc<dyn PaymentRepository>,
        currency: impl Into<String>,
        notification_url: Option<String>,
    ) -> Self {
        Self {
            gateway,
            repository,
            currency: currency.into(),
            notification_url,
        }
    }

    /// Create a preference at the gateway and persist the pending record.
    ///
    /// The record is created only after the gateway call succeeds; a
    /// gateway failure leaves no trace.
    pub async fn handle(
        &self,
        cmd: CreateCheckoutCommand,
    ) -> Result<CheckoutCreated, CreateCheckoutError> {
        if cmd.amount_cents <= 0 {
            return Err(ValidationError::not_positive("amount_cents", cmd.amount_cents).into());
        }
        if cmd.description.trim().is_empty() {
            return Err(ValidationError::empty_field("description").into());
        }
        if cmd.payer_email.trim().is_empty() {
            return Err(ValidationError::empty_field("payer_email").into());
        }

        let reference = ExternalReference::new();
        let preference = self
            .gateway
            .create_preference(CreatePreferenceRequest {
                amount_cents: cmd.amount_cents,
                description: cmd.description.clone(),
                payer_email: cmd.payer_email.clone(),
                external_reference: reference.clone(),
                notification_url: self.notification_url.clone(),
            })
            .await?;

        let record = PaymentRecord::new_pending(
            reference.clone(),
            cmd.amount_cents,
            self.currency.clone(),
            cmd.payer_email,
        )?
        .with_metadata("description", cmd.description);

        self.repository.insert(&record).await?;

        tracing::info!(
            reference = %reference,
            amount_cents = cmd.amount_cents,
            "Checkout preference created"
        );

        Ok(CheckoutCreated {
            checkout_url: preference.checkout_url,
            external_reference: reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockGatewayClient;
    use crate::adapters::persistence::InMemoryPaymentRepository;
    use crate::domain::payment::PaymentStatus;

    fn handler(
        gateway: Arc<MockGatewayClient>,
        repository: Arc<InMemoryPaymentRepository>,
    ) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            gateway,
            repository,
            "ARS",
            Some("https://hub.example.com/webhooks/payment".to_string()),
        )
    }

    fn membership_fee() -> CreateCheckoutCommand {
        CreateCheckoutCommand {
            amount_cents: 10_000,
            description: "Membership Fee".to_string(),
            payer_email: "a@x.com".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_pending_record_on_success() {
        let gateway = Arc::new(MockGatewayClient::new());
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway.clone(), repository.clone());

        let created = handler.handle(membership_fee()).await.unwrap();

        let record = repository
            .find_by_reference(&created.external_reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.amount_cents, 10_000);
        assert_eq!(record.payer_email, "a@x.com");
        assert!(!created.checkout_url.is_empty());
    }

    #[tokio::test]
    async fn passes_reference_and_notification_url_to_gateway() {
        let gateway = Arc::new(MockGatewayClient::new());
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway.clone(), repository);

        let created = handler.handle(membership_fee()).await.unwrap();

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].external_reference, created.external_reference);
        assert_eq!(
            requests[0].notification_url.as_deref(),
            Some("https://hub.example.com/webhooks/payment")
        );
    }

    #[tokio::test]
    async fn rejects_non_positive_amount_before_gateway_call() {
        let gateway = Arc::new(MockGatewayClient::new());
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway.clone(), repository);

        let result = handler
            .handle(CreateCheckoutCommand {
                amount_cents: 0,
                ..membership_fee()
            })
            .await;

        assert!(matches!(result, Err(CreateCheckoutError::Validation(_))));
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn rejects_empty_description() {
        let gateway = Arc::new(MockGatewayClient::new());
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway, repository);

        let result = handler
            .handle(CreateCheckoutCommand {
                description: "   ".to_string(),
                ..membership_fee()
            })
            .await;

        assert!(matches!(result, Err(CreateCheckoutError::Validation(_))));
    }

    #[tokio::test]
    async fn gateway_failure_creates_no_record() {
        let gateway = Arc::new(MockGatewayClient::new());
        gateway.fail_next();
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway, repository.clone());

        let result = handler.handle(membership_fee()).await;

        match result {
            Err(CreateCheckoutError::Gateway(e)) => assert!(e.retryable),
            other => panic!("Expected gateway error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn each_checkout_gets_a_fresh_reference() {
        let gateway = Arc::new(MockGatewayClient::new());
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let handler = handler(gateway, repository);

        let first = handler.handle(membership_fee()).await.unwrap();
        let second = handler.handle(membership_fee()).await.unwrap();

        assert_ne!(first.external_reference, second.external_reference);
    }
}
