//! QueueBroker port - Durable at-least-once delivery abstraction.
//!
//! The broker decouples webhook admission from status processing. It
//! guarantees at-least-once delivery and makes NO ordering promise:
//! consumers must be designed assuming reordering and duplication.
//!
//! Messages that exceed the configured delivery attempt cap move to the
//! queue's dead-letter sibling for operator inspection instead of looping
//! forever as poison messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::WebhookEvent;

/// Envelope placed on the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Broker-side message identity (distinct from the webhook event id).
    pub message_id: Uuid,

    /// When the message was first enqueued.
    pub enqueued_at: Timestamp,

    /// Delivery counter, starting at 1 for the first delivery and
    /// incremented by the broker on each redelivery.
    pub delivery_attempt: u32,

    /// The normalized webhook event being transported.
    pub payload: WebhookEvent,
}

impl QueueMessage {
    /// Wrap a webhook event for enqueueing.
    pub fn new(payload: WebhookEvent) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            enqueued_at: Timestamp::now(),
            delivery_attempt: 0,
            payload,
        }
    }
}

/// Errors from broker operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has not been provisioned.
    #[error("Queue '{0}' is not provisioned")]
    NotProvisioned(String),

    /// The backing transport failed.
    #[error("Queue backend error: {0}")]
    Backend(String),

    /// Message (de)serialization failed.
    #[error("Queue serialization error: {0}")]
    Serialization(String),
}

/// Port for the durable message queue.
///
/// Guarantees:
/// - At-least-once delivery: a message is redelivered until acked.
/// - No ordering across the queue.
/// - `nack` past the attempt cap dead-letters the message.
#[async_trait]
pub trait QueueBroker: Send + Sync {
    /// Ensure the queue (and its dead-letter sibling) exists.
    ///
    /// Idempotent and safe to call repeatedly and concurrently at
    /// startup.
    async fn provision(&self, queue: &str) -> Result<(), QueueError>;

    /// Enqueue a message.
    async fn send(&self, queue: &str, message: QueueMessage) -> Result<(), QueueError>;

    /// Pull up to `max_count` messages. Received messages are in-flight
    /// until explicitly acked or nacked; `delivery_attempt` reflects the
    /// current delivery.
    async fn receive_batch(
        &self,
        queue: &str,
        max_count: u32,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge successful processing; the message is gone.
    async fn ack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError>;

    /// Negative-acknowledge: the message returns to the queue for
    /// redelivery, or moves to the dead-letter queue once its attempt
    /// count reaches the broker's cap.
    async fn nack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError>;

    /// Read (without consuming) messages parked on the dead-letter
    /// queue, newest last. For operator tooling and tests.
    async fn dead_letters(&self, queue: &str) -> Result<Vec<QueueMessage>, QueueError>;
}
