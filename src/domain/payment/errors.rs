//! Webhook error types for payment webhook handling.
//!
//! Defines all error conditions that can occur during webhook admission
//! and processing, with HTTP status code mapping and retryability
//! semantics. Status codes matter here: the gateway treats 5xx as
//! "retry later", so business-logic rejections must never map to 5xx.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook admission and processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Failed to parse the webhook payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Referenced payment record could not be found.
    ///
    /// May be eventual consistency: the preference-creation write can
    /// lag the first webhook.
    #[error("Payment record not found")]
    PaymentNotFound,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Queue broker operation failed.
    #[error("Queue error: {0}")]
    Queue(String),

    /// Idempotency store operation failed.
    #[error("Idempotency store error: {0}")]
    Store(String),
}

impl WebhookError {
    /// Returns true if the gateway (or broker) should retry delivery.
    ///
    /// Retryable errors indicate temporary failures that may succeed
    /// on subsequent attempts (infrastructure issues, eventual
    /// consistency).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_)
                | WebhookError::Queue(_)
                | WebhookError::Store(_)
                | WebhookError::PaymentNotFound
        )
    }

    /// Maps the error to an appropriate HTTP status code for the
    /// webhook endpoint.
    ///
    /// Status codes determine the gateway's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failure - don't retry
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,

            // Structurally invalid - don't retry
            WebhookError::ParseError(_) | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Genuine unavailability - the gateway should retry
            WebhookError::PaymentNotFound
            | WebhookError::Database(_)
            | WebhookError::Queue(_)
            | WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
