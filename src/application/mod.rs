//! Application layer - the pipeline's command handlers and services.

mod create_checkout;
mod get_payment_status;
mod status_processor;
mod webhook_receiver;

pub use create_checkout::{
    CheckoutCreated, CreateCheckoutCommand, CreateCheckoutError, CreateCheckoutHandler,
};
pub use get_payment_status::{GetPaymentStatusHandler, PaymentStatusView};
pub use status_processor::{PaymentStatusProcessor, ProcessOutcome, ProcessorConfig};
pub use webhook_receiver::{AdmissionOutcome, WebhookReceiver, WebhookVerifier};
