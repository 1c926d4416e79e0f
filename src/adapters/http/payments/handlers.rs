//! Axum handlers for the payment endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::{
    AdmissionOutcome, CreateCheckoutCommand, CreateCheckoutError, CreateCheckoutHandler,
    GetPaymentStatusHandler, WebhookReceiver,
};
use crate::domain::foundation::{DomainError, ExternalReference};

use super::dto::{CheckoutResponseDto, CreateCheckoutRequestDto, ErrorResponseDto};

/// Request header carrying the gateway's HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Shared state for the payment endpoints.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub checkout: Arc<CreateCheckoutHandler>,
    pub status: Arc<GetPaymentStatusHandler>,
    pub receiver: Arc<WebhookReceiver>,
}

/// `POST /payments/checkout` - start a checkout flow.
pub async fn create_checkout(
    State(state): State<PaymentsAppState>,
    Json(body): Json<CreateCheckoutRequestDto>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let created = state
        .checkout
        .handle(CreateCheckoutCommand {
            amount_cents: body.amount_cents,
            description: body.description,
            payer_email: body.payer_email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponseDto {
            checkout_url: created.checkout_url,
            external_reference: created.external_reference.to_string(),
        }),
    ))
}

/// `GET /payments/:external_reference` - polling status read.
pub async fn get_payment_status(
    State(state): State<PaymentsAppState>,
    Path(external_reference): Path<String>,
) -> Result<Response, PaymentsApiError> {
    let reference = ExternalReference::from_string(external_reference);
    let view = state.status.handle(&reference).await?;

    match view {
        Some(view) => Ok((StatusCode::OK, Json(view)).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponseDto::new(
                "PAYMENT_NOT_FOUND",
                format!("No payment for reference {}", reference),
            )),
        )
            .into_response()),
    }
}

/// `POST /webhooks/payment` - gateway webhook endpoint.
///
/// Response codes drive the gateway's retry engine:
/// - 202: first delivery, admitted and enqueued
/// - 200: redelivery of an already-admitted event
/// - 400: structurally invalid payload (never retried)
/// - 401: bad signature (never retried)
/// - 5xx: genuine unavailability only; the gateway will retry
pub async fn handle_payment_webhook(
    State(state): State<PaymentsAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.receiver.receive(&body, signature).await {
        Ok(AdmissionOutcome::Accepted) => StatusCode::ACCEPTED.into_response(),
        Ok(AdmissionOutcome::Duplicate) => StatusCode::OK.into_response(),
        Err(e) => {
            let status = e.status_code();
            (
                status,
                Json(ErrorResponseDto::new("WEBHOOK_REJECTED", e.to_string())),
            )
                .into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════

/// API error type that converts pipeline errors to HTTP responses.
#[derive(Debug)]
pub struct PaymentsApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<CreateCheckoutError> for PaymentsApiError {
    fn from(err: CreateCheckoutError) -> Self {
        match &err {
            CreateCheckoutError::Validation(_) => Self {
                status: StatusCode::BAD_REQUEST,
                code: "VALIDATION_FAILED",
                message: err.to_string(),
            },
            CreateCheckoutError::Gateway(gateway) => Self {
                // Retryable gateway trouble is a 502 the front end may
                // retry; a hard rejection is on us to investigate.
                status: if gateway.retryable {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                code: "GATEWAY_ERROR",
                message: err.to_string(),
            },
            CreateCheckoutError::Repository(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "INTERNAL_ERROR",
                message: err.to_string(),
            },
        }
    }
}

impl From<DomainError> for PaymentsApiError {
    fn from(err: DomainError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponseDto::new(self.code, self.message)),
        )
            .into_response()
    }
}
