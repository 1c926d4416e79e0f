//! GatewayClient port - Interface for checkout preference creation.
//!
//! Defines the contract for the external payment gateway integration.
//! The client is pure request/response: it creates a checkout preference
//! and returns the redirect URL, holding no state of its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ExternalReference;

/// Port for the payment gateway REST API.
///
/// Failures are surfaced to the caller as-is; the client performs no
/// internal retries. Callers decide whether a retryable error is worth
/// another attempt.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create a checkout preference at the gateway.
    ///
    /// On success the gateway returns a URL the paying user is redirected
    /// to. No payment record exists gateway-side until the user acts on it.
    async fn create_preference(
        &self,
        request: CreatePreferenceRequest,
    ) -> Result<CheckoutPreference, GatewayError>;
}

/// Request to create a checkout preference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePreferenceRequest {
    /// Amount in minor currency units; must be positive.
    pub amount_cents: i64,

    /// Human-readable purchase description; must be non-empty.
    pub description: String,

    /// Payer email for gateway pre-fill.
    pub payer_email: String,

    /// Our correlation key, echoed back on every webhook.
    pub external_reference: ExternalReference,

    /// Webhook target URL for this preference, when configured.
    pub notification_url: Option<String>,
}

/// A checkout preference created at the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutPreference {
    /// Gateway-side preference id.
    pub preference_id: String,

    /// URL the paying user is redirected to.
    pub checkout_url: String,

    /// The correlation key the preference was created under.
    pub external_reference: ExternalReference,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct GatewayError {
    /// Error category.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }
}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Gateway rejected the request.
    ProviderError,

    /// Gateway response could not be interpreted.
    InvalidResponse,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
