//! Mock gateway client for tests and local development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{CheckoutPreference, CreatePreferenceRequest, GatewayClient, GatewayError};

/// In-memory `GatewayClient` that fabricates checkout URLs.
///
/// Records every request for assertions and can be switched into a
/// failing mode to exercise error paths.
pub struct MockGatewayClient {
    requests: Mutex<Vec<CreatePreferenceRequest>>,
    fail_next: AtomicBool,
}

impl MockGatewayClient {
    /// Create a new mock that succeeds.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next `create_preference` call fail with a network error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Requests seen so far (for test assertions).
    pub fn requests(&self) -> Vec<CreatePreferenceRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("mock lock poisoned").len()
    }
}

impl Default for MockGatewayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn create_preference(
        &self,
        request: CreatePreferenceRequest,
    ) -> Result<CheckoutPreference, GatewayError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::network("mock gateway unavailable"));
        }

        let reference = request.external_reference.clone();
        self.requests.lock().expect("mock lock poisoned").push(request);

        Ok(CheckoutPreference {
            preference_id: format!("pref-{}", reference),
            checkout_url: format!("https://checkout.example.com/{}", reference),
            external_reference: reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ExternalReference;

    fn test_request() -> CreatePreferenceRequest {
        CreatePreferenceRequest {
            amount_cents: 10_000,
            description: "Membership Fee".to_string(),
            payer_email: "a@x.com".to_string(),
            external_reference: ExternalReference::from_string("ref-mock"),
            notification_url: None,
        }
    }

    #[tokio::test]
    async fn mock_returns_checkout_url_with_reference() {
        let mock = MockGatewayClient::new();

        let preference = mock.create_preference(test_request()).await.unwrap();

        assert!(preference.checkout_url.contains("ref-mock"));
        assert_eq!(preference.external_reference.as_str(), "ref-mock");
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let mock = MockGatewayClient::new();

        mock.create_preference(test_request()).await.unwrap();
        mock.create_preference(test_request()).await.unwrap();

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[0].amount_cents, 10_000);
    }

    #[tokio::test]
    async fn fail_next_fails_exactly_once() {
        let mock = MockGatewayClient::new();
        mock.fail_next();

        let first = mock.create_preference(test_request()).await;
        let second = mock.create_preference(test_request()).await;

        assert!(first.is_err());
        assert!(first.unwrap_err().retryable);
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn failed_calls_are_not_recorded() {
        let mock = MockGatewayClient::new();
        mock.fail_next();

        let _ = mock.create_preference(test_request()).await;

        assert_eq!(mock.request_count(), 0);
    }
}
