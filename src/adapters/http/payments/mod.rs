//! HTTP surface of the payment pipeline.

mod dto;
mod handlers;
mod routes;

pub use dto::{CheckoutResponseDto, CreateCheckoutRequestDto, ErrorResponseDto};
pub use handlers::{
    create_checkout, get_payment_status, handle_payment_webhook, PaymentsApiError,
    PaymentsAppState, SIGNATURE_HEADER,
};
pub use routes::{live_router, payment_routes, payments_router, webhook_routes};
