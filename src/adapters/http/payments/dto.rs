//! Request/response DTOs for the payment endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /payments/checkout`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequestDto {
    /// Amount in minor currency units.
    pub amount_cents: i64,

    /// Purchase description.
    pub description: String,

    /// Payer email.
    pub payer_email: String,
}

/// Response body for `POST /payments/checkout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponseDto {
    /// URL the client redirects the payer to.
    pub checkout_url: String,

    /// Reference for status polling and the live channel.
    pub external_reference: String,
}

/// Error body returned by payment endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponseDto {
    pub error: String,
    pub message: String,
}

impl ErrorResponseDto {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_request_deserializes_camel_case() {
        let json = r#"{
            "amountCents": 10000,
            "description": "Membership Fee",
            "payerEmail": "a@x.com"
        }"#;

        let dto: CreateCheckoutRequestDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.amount_cents, 10_000);
        assert_eq!(dto.description, "Membership Fee");
        assert_eq!(dto.payer_email, "a@x.com");
    }

    #[test]
    fn checkout_response_serializes_camel_case() {
        let dto = CheckoutResponseDto {
            checkout_url: "https://checkout.example.com/abc".to_string(),
            external_reference: "ref-1".to_string(),
        };

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["checkoutUrl"], "https://checkout.example.com/abc");
        assert_eq!(json["externalReference"], "ref-1");
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let dto = ErrorResponseDto::new("VALIDATION_FAILED", "amount must be positive");
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["error"], "VALIDATION_FAILED");
    }
}
