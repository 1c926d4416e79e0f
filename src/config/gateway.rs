//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Gateway API access token
    pub access_token: String,

    /// Base URL of the gateway REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Publicly reachable URL the gateway posts webhooks to
    pub notification_url: Option<String>,

    /// Webhook signing secret. When set, inbound webhook signatures
    /// are verified; when absent, signature checks are skipped.
    pub webhook_secret: Option<String>,

    /// Currency code used for checkout preferences
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Gateway request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_ACCESS_TOKEN"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ValidationError::InvalidGatewayUrl);
        }
        if self.currency.len() != 3 {
            return Err(ValidationError::MissingRequired("GATEWAY_CURRENCY"));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: default_base_url(),
            notification_url: None,
            webhook_secret: None,
            currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.payments.example.com".to_string()
}

fn default_currency() -> String {
    "ARS".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_token() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = GatewayConfig {
            access_token: "TEST-abc123".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_base_url() {
        let config = GatewayConfig {
            access_token: "TEST-abc123".to_string(),
            base_url: "ftp://gateway.example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_currency() {
        let config = GatewayConfig {
            access_token: "TEST-abc123".to_string(),
            currency: "PESOS".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_secret_defaults_to_none() {
        let config = GatewayConfig::default();
        assert!(config.webhook_secret.is_none());
    }
}
