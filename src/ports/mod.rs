//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Pipeline Ports
//!
//! - `GatewayClient` - Checkout preference creation at the payment gateway
//! - `PaymentRepository` - Payment record persistence with conditional updates
//! - `QueueBroker` - Durable at-least-once delivery with dead-lettering
//! - `IdempotencyStore` - Atomic tracking of processed webhook event ids
//! - `StatusPublisher` - Best-effort live push to waiting clients

mod gateway_client;
mod idempotency_store;
mod payment_repository;
mod queue_broker;
mod status_publisher;

pub use gateway_client::{
    CheckoutPreference, CreatePreferenceRequest, GatewayClient, GatewayError, GatewayErrorCode,
};
pub use idempotency_store::IdempotencyStore;
pub use payment_repository::{PaymentRepository, UpdateOutcome};
pub use queue_broker::{QueueBroker, QueueError, QueueMessage};
pub use status_publisher::{StatusPublisher, StatusUpdate};
