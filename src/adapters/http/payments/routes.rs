//! Axum router configuration for the payment pipeline endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::websocket::{ws_handler, WebSocketState};

use super::handlers::{
    create_checkout, get_payment_status, handle_payment_webhook, PaymentsAppState,
};

/// Create the payment API router.
///
/// # Routes
///
/// - `POST /checkout` - Start a checkout flow
/// - `GET /:external_reference` - Poll payment status (push fallback)
pub fn payment_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/:external_reference", get(get_payment_status))
}

/// Create the gateway webhook router.
///
/// Separate from the payment routes because webhooks carry no user
/// session; they are authenticated by signature when a secret is
/// configured.
///
/// # Routes
/// - `POST /payment` - Gateway webhook endpoint
pub fn webhook_routes() -> Router<PaymentsAppState> {
    Router::new().route("/payment", post(handle_payment_webhook))
}

/// Create the complete payment module router.
///
/// # Example
///
/// ```ignore
/// let app = payments_router()
///     .with_state(app_state)
///     .merge(live_router(ws_state));
/// ```
pub fn payments_router() -> Router<PaymentsAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
}

/// Create the live push router with its own WebSocket state.
///
/// # Routes
/// - `GET /ws/payments/:external_reference` - Live status channel
pub fn live_router(state: WebSocketState) -> Router {
    Router::new()
        .route("/ws/payments/:external_reference", get(ws_handler))
        .with_state(state)
}
