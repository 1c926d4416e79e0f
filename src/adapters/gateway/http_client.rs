//! HTTP payment gateway adapter.
//!
//! Implements the `GatewayClient` trait against the gateway's REST API.
//!
//! # Security
//!
//! - API credentials held as `secrecy::SecretString`
//! - Bearer authentication on every request
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpGatewayConfig::new(access_token)
//!     .with_base_url("https://api.gateway.example.com");
//! let client = HttpGatewayClient::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::ports::{CheckoutPreference, CreatePreferenceRequest, GatewayClient, GatewayError};

/// Gateway API configuration.
#[derive(Clone)]
pub struct HttpGatewayConfig {
    /// Gateway API access token.
    access_token: SecretString,

    /// Base URL for the gateway REST API.
    base_url: String,

    /// Default webhook target attached to created preferences.
    notification_url: Option<String>,

    /// Request timeout.
    request_timeout: Duration,
}

impl HttpGatewayConfig {
    /// Create a new configuration with the given access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            base_url: "https://api.payments.example.com".to_string(),
            notification_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Build from the application configuration section.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            access_token: SecretString::new(config.access_token.clone()),
            base_url: config.base_url.clone(),
            notification_url: config.notification_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default notification URL.
    pub fn with_notification_url(mut self, url: impl Into<String>) -> Self {
        self.notification_url = Some(url.into());
        self
    }
}

/// HTTP implementation of the `GatewayClient` port.
pub struct HttpGatewayClient {
    config: HttpGatewayConfig,
    http_client: reqwest::Client,
}

/// Wire shape of a preference creation request.
#[derive(Debug, Serialize)]
struct PreferenceRequestBody<'a> {
    amount_cents: i64,
    description: &'a str,
    payer_email: &'a str,
    external_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
}

/// Wire shape of a preference creation response.
#[derive(Debug, Deserialize)]
struct PreferenceResponseBody {
    id: String,
    checkout_url: String,
}

impl HttpGatewayClient {
    /// Create a new client with the given configuration.
    pub fn new(config: HttpGatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            config,
            http_client,
        }
    }

    fn preferences_url(&self) -> String {
        format!(
            "{}/checkout/preferences",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn map_status_error(status: reqwest::StatusCode, body: String) -> GatewayError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return GatewayError::authentication(format!("Gateway rejected credentials: {}", body));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return GatewayError::new(
                crate::ports::GatewayErrorCode::RateLimitExceeded,
                "Gateway rate limit exceeded",
            );
        }
        if status.is_server_error() {
            // Gateway-side outages are worth retrying
            return GatewayError {
                code: crate::ports::GatewayErrorCode::ProviderError,
                message: format!("Gateway unavailable ({}): {}", status, body),
                retryable: true,
            };
        }
        GatewayError::provider(format!("Gateway rejected request ({}): {}", status, body))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_preference(
        &self,
        request: CreatePreferenceRequest,
    ) -> Result<CheckoutPreference, GatewayError> {
        let notification_url = request
            .notification_url
            .as_deref()
            .or(self.config.notification_url.as_deref());

        let body = PreferenceRequestBody {
            amount_cents: request.amount_cents,
            description: &request.description,
            payer_email: &request.payer_email,
            external_reference: request.external_reference.as_str(),
            notification_url,
        };

        let response = self
            .http_client
            .post(self.preferences_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(format!("Preference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let parsed: PreferenceResponseBody = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Malformed preference response: {}", e))
        })?;

        if parsed.checkout_url.is_empty() {
            return Err(GatewayError::invalid_response(
                "Preference response missing checkout_url",
            ));
        }

        Ok(CheckoutPreference {
            preference_id: parsed.id,
            checkout_url: parsed.checkout_url,
            external_reference: request.external_reference,
        })
    }
}
