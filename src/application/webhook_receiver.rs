//! WebhookReceiver - fast admission control for gateway webhooks.
//!
//! Payment gateways apply aggressive timeouts and retry policies to
//! slow webhook endpoints, so this service does the minimum work needed
//! to answer: verify, validate, dedup, enqueue. The full state-machine
//! update happens later on the queue consumer.
//!
//! ## Admission sequence
//!
//! 1. Verify the HMAC signature (when a secret is configured)
//! 2. Parse and structurally validate the payload
//! 3. Atomically record the event id; an already-seen id is
//!    acknowledged without enqueueing
//! 4. Enqueue the normalized event and acknowledge
//!
//! If the enqueue fails after the id was recorded, the reservation is
//! released again so the gateway's retry is not mistaken for a
//! duplicate.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{WebhookError, WebhookEvent};
use crate::ports::{IdempotencyStore, QueueBroker, QueueMessage};

type HmacSha256 = Hmac<Sha256>;

/// Result of admitting a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// First delivery; the event was enqueued.
    Accepted,

    /// Redelivery of an already-admitted event; acknowledged without
    /// enqueueing.
    Duplicate,
}

/// Verifies webhook signatures with HMAC-SHA256.
///
/// The gateway signs the raw request body; the hex digest travels in a
/// request header. Comparison is constant-time.
pub struct WebhookVerifier {
    secret: SecretString,
}

impl WebhookVerifier {
    /// Create a verifier for the given signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    /// Verify a signature against the raw payload.
    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> Result<(), WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(payload);
        let expected = hex_encode(&mac.finalize().into_bytes());

        let provided = signature_hex.trim().to_ascii_lowercase();
        if expected.len() != provided.len() {
            return Err(WebhookError::InvalidSignature);
        }
        if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Admission-control service for the webhook endpoint.
pub struct WebhookReceiver {
    store: Arc<dyn IdempotencyStore>,
    broker: Arc<dyn QueueBroker>,
    queue: String,
    verifier: Option<WebhookVerifier>,
}

impl WebhookReceiver {
    /// Create a receiver enqueueing onto the given queue.
    pub fn new(
        store: Arc<dyn IdempotencyStore>,
        broker: Arc<dyn QueueBroker>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            queue: queue.into(),
            verifier: None,
        }
    }

    /// Enable signature verification with the given secret.
    pub fn with_verifier(mut self, verifier: WebhookVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Admit one webhook delivery.
    pub async fn receive(
        &self,
        raw_payload: &[u8],
        signature: Option<&str>,
    ) -> Result<AdmissionOutcome, WebhookError> {
        if let Some(verifier) = &self.verifier {
            let signature = signature.ok_or(WebhookError::InvalidSignature)?;
            verifier.verify(raw_payload, signature)?;
        }

        let event = match WebhookEvent::parse(raw_payload, Timestamp::now()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    payload = %String::from_utf8_lossy(raw_payload),
                    error = %e,
                    "Rejected malformed webhook payload"
                );
                return Err(e);
            }
        };

        let admitted = self
            .store
            .insert_if_absent(&event.external_event_id)
            .await
            .map_err(|e| WebhookError::Store(e.to_string()))?;

        if !admitted {
            tracing::debug!(
                event_id = %event.external_event_id,
                "Duplicate webhook delivery acknowledged"
            );
            return Ok(AdmissionOutcome::Duplicate);
        }

        let event_id = event.external_event_id.clone();
        if let Err(e) = self.broker.send(&self.queue, QueueMessage::new(event)).await {
            // Release the reservation so the gateway's retry is admitted.
            if let Err(remove_err) = self.store.remove(&event_id).await {
                tracing::error!(
                    event_id = %event_id,
                    error = %remove_err,
                    "Failed to release dedup reservation after enqueue failure"
                );
            }
            tracing::error!(event_id = %event_id, error = %e, "Failed to enqueue webhook event");
            return Err(WebhookError::Queue(e.to_string()));
        }

        tracing::info!(event_id = %event_id, "Webhook event admitted");
        Ok(AdmissionOutcome::Accepted)
    }
}
