//! Gateway webhook event types.
//!
//! Defines the structures for parsing gateway webhook payloads.
//! Only fields relevant to our processing are captured.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ExternalReference, Timestamp};

use super::{PaymentStatus, WebhookError};

/// One inbound gateway notification, normalized but not yet processed.
///
/// `external_event_id` is globally unique per gateway delivery and serves
/// as the idempotency key: a second delivery with the same id must be
/// acknowledged without being reapplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Gateway-assigned event id (the idempotency key).
    pub external_event_id: String,

    /// Coarse event category (e.g. "payment").
    pub event_type: String,

    /// Fine-grained action (e.g. "payment.created", "payment.updated").
    pub action: String,

    /// Gateway payment id the event refers to.
    pub external_payment_id: String,

    /// Checkout reference echoed back by the gateway, when present.
    pub external_reference: Option<ExternalReference>,

    /// Raw gateway status string, when the event carries one.
    pub status: Option<String>,

    /// Gateway diagnostic accompanying the status.
    pub status_detail: Option<String>,

    /// Provider-side creation time of the event; drives stale ordering.
    pub provider_created_at: Timestamp,

    /// When our endpoint received the delivery.
    pub received_at: Timestamp,

    /// Original payload, retained for forensics.
    pub raw_payload: serde_json::Value,
}

/// Known webhook actions we route on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    /// A payment object was created at the gateway.
    PaymentCreated,
    /// A payment changed state.
    PaymentUpdated,
    /// Unknown or unhandled action.
    Unknown,
}

/// Wire shape of a gateway webhook body.
///
/// The contract requires at minimum:
/// `{ id, type, action, data: { id }, date_created }`.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    action: String,
    data: WebhookPayloadData,
    date_created: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WebhookPayloadData {
    id: String,
    status: Option<String>,
    status_detail: Option<String>,
    external_reference: Option<String>,
}

impl WebhookEvent {
    /// Parse and structurally validate a raw webhook body.
    ///
    /// A payload that fails validation here is rejected at admission (400)
    /// and never enters the pipeline.
    pub fn parse(raw: &[u8], received_at: Timestamp) -> Result<Self, WebhookError> {
        let raw_payload: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| WebhookError::ParseError(format!("Invalid JSON: {}", e)))?;

        let payload: WebhookPayload = serde_json::from_value(raw_payload.clone())
            .map_err(|e| WebhookError::ParseError(format!("Invalid payload shape: {}", e)))?;

        if payload.id.is_empty() {
            return Err(WebhookError::MissingField("id"));
        }
        if payload.event_type.is_empty() {
            return Err(WebhookError::MissingField("type"));
        }
        if payload.action.is_empty() {
            return Err(WebhookError::MissingField("action"));
        }
        if payload.data.id.is_empty() {
            return Err(WebhookError::MissingField("data.id"));
        }

        let provider_created_at = parse_provider_timestamp(&payload.date_created)?;

        Ok(Self {
            external_event_id: payload.id,
            event_type: payload.event_type,
            action: payload.action,
            external_payment_id: payload.data.id,
            external_reference: payload
                .data
                .external_reference
                .filter(|r| !r.is_empty())
                .map(ExternalReference::from_string),
            status: payload.data.status.filter(|s| !s.is_empty()),
            status_detail: payload.data.status_detail,
            provider_created_at,
            received_at,
            raw_payload,
        })
    }

    /// Classify the event action.
    pub fn kind(&self) -> WebhookKind {
        match self.action.as_str() {
            "payment.created" => WebhookKind::PaymentCreated,
            "payment.updated" => WebhookKind::PaymentUpdated,
            _ => WebhookKind::Unknown,
        }
    }

    /// The status the event asks the record to move to, if it carries
    /// one we recognize.
    pub fn target_status(&self) -> Option<PaymentStatus> {
        self.status.as_deref().and_then(PaymentStatus::parse)
    }
}

/// `date_created` arrives as RFC 3339 from the REST webhook API but as
/// Unix seconds from older integrations; accept both.
fn parse_provider_timestamp(value: &serde_json::Value) -> Result<Timestamp, WebhookError> {
    match value {
        serde_json::Value::String(s) => Timestamp::parse_rfc3339(s)
            .map_err(|e| WebhookError::ParseError(format!("Invalid date_created: {}", e))),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Timestamp::from_unix_secs)
            .ok_or_else(|| WebhookError::ParseError("Invalid date_created number".to_string())),
        _ => Err(WebhookError::MissingField("date_created")),
    }
}

/// Builder for creating test WebhookEvent instances.
#[cfg(test)]
pub struct WebhookEventBuilder {
    external_event_id: String,
    event_type: String,
    action: String,
    external_payment_id: String,
    external_reference: Option<String>,
    status: Option<String>,
    status_detail: Option<String>,
    provider_created_at: Timestamp,
}

#[cfg(test)]
impl Default for WebhookEventBuilder {
    fn default() -> Self {
        Self {
            external_event_id: "evt-test-1".to_string(),
            event_type: "payment".to_string(),
            action: "payment.updated".to_string(),
            external_payment_id: "pay-1".to_string(),
            external_reference: None,
            status: None,
            status_detail: None,
            provider_created_at: Timestamp::from_unix_secs(1_700_000_000),
        }
    }
}

#[cfg(test)]
impl WebhookEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_id(mut self, id: impl Into<String>) -> Self {
        self.external_event_id = id.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn payment_id(mut self, id: impl Into<String>) -> Self {
        self.external_payment_id = id.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn status_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = Some(detail.into());
        self
    }

    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.provider_created_at = ts;
        self
    }

    pub fn build(self) -> WebhookEvent {
        WebhookEvent {
            external_event_id: self.external_event_id,
            event_type: self.event_type,
            action: self.action,
            external_payment_id: self.external_payment_id,
            external_reference: self.external_reference.map(ExternalReference::from_string),
            status: self.status,
            status_detail: self.status_detail,
            provider_created_at: self.provider_created_at,
            received_at: Timestamp::now(),
            raw_payload: serde_json::json!({}),
        }
    }
}
