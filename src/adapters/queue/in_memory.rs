//! In-memory queue broker for tests and single-process runs.
//!
//! Implements the full `QueueBroker` contract: at-least-once delivery,
//! in-flight tracking between receive and ack/nack, and automatic
//! dead-lettering past the attempt cap. Delivery order is incidental
//! and carries no guarantee, matching the port.
//!
//! # Security Note
//!
//! This adapter is for testing and local development. It uses
//! `.expect()` on lock operations which will panic if locks are
//! poisoned; production deployments should use the Redis broker.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::ports::{QueueBroker, QueueError, QueueMessage};

#[derive(Default)]
struct QueueState {
    ready: VecDeque<QueueMessage>,
    in_flight: HashMap<Uuid, QueueMessage>,
    dead: Vec<QueueMessage>,
}

/// In-memory `QueueBroker`.
pub struct InMemoryQueueBroker {
    queues: Mutex<HashMap<String, QueueState>>,
    max_delivery_attempts: u32,
}

impl InMemoryQueueBroker {
    /// Creates a broker that dead-letters after `max_delivery_attempts`
    /// deliveries of the same message.
    pub fn new(max_delivery_attempts: u32) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            max_delivery_attempts,
        }
    }

    /// Whether a queue has been provisioned (for test assertions).
    pub fn is_provisioned(&self, queue: &str) -> bool {
        self.queues
            .lock()
            .expect("broker lock poisoned")
            .contains_key(queue)
    }

    /// Messages waiting for delivery (for test assertions).
    pub fn ready_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .expect("broker lock poisoned")
            .get(queue)
            .map(|q| q.ready.len())
            .unwrap_or(0)
    }

    /// Messages received but not yet acked or nacked (for test assertions).
    pub fn in_flight_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .expect("broker lock poisoned")
            .get(queue)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl QueueBroker for InMemoryQueueBroker {
    async fn provision(&self, queue: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().expect("broker lock poisoned");
        queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn send(&self, queue: &str, message: QueueMessage) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().expect("broker lock poisoned");
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::NotProvisioned(queue.to_string()))?;
        state.ready.push_back(message);
        Ok(())
    }

    async fn receive_batch(
        &self,
        queue: &str,
        max_count: u32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut queues = self.queues.lock().expect("broker lock poisoned");
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::NotProvisioned(queue.to_string()))?;

        let mut batch = Vec::new();
        while batch.len() < max_count as usize {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.delivery_attempt += 1;
            state.in_flight.insert(message.message_id, message.clone());
            batch.push(message);
        }
        Ok(batch)
    }

    async fn ack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().expect("broker lock poisoned");
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::NotProvisioned(queue.to_string()))?;
        state.in_flight.remove(&message.message_id);
        Ok(())
    }

    async fn nack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().expect("broker lock poisoned");
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::NotProvisioned(queue.to_string()))?;

        let Some(message) = state.in_flight.remove(&message.message_id) else {
            // Unknown or already settled message; nothing to redeliver.
            return Ok(());
        };

        if message.delivery_attempt >= self.max_delivery_attempts {
            state.dead.push(message);
        } else {
            state.ready.push_back(message);
        }
        Ok(())
    }

    async fn dead_letters(&self, queue: &str) -> Result<Vec<QueueMessage>, QueueError> {
        let queues = self.queues.lock().expect("broker lock poisoned");
        let state = queues
            .get(queue)
            .ok_or_else(|| QueueError::NotProvisioned(queue.to_string()))?;
        Ok(state.dead.clone())
    }
}
