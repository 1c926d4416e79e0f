//! Redis-backed queue broker.
//!
//! The durable counterpart to the in-memory broker, built on Redis
//! lists:
//!
//! - `queue:<name>` - ready messages (LPUSH producer side)
//! - `queue:<name>:processing` - in-flight messages, moved atomically
//!   via LMOVE on receive
//! - `queue:<name>:dead` - dead-lettered messages past the attempt cap
//!
//! Messages are serialized as JSON envelopes. A message stays on the
//! processing list until acked or nacked; a crashed consumer leaves its
//! messages parked there for an operator (or a future reaper) to
//! requeue, which preserves at-least-once semantics without inventing
//! delivery guarantees Redis does not have.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::ports::{QueueBroker, QueueError, QueueMessage};

/// Redis implementation of the `QueueBroker` port.
pub struct RedisQueueBroker {
    connection: MultiplexedConnection,
    max_delivery_attempts: u32,
}

impl RedisQueueBroker {
    /// Create a broker over an established connection.
    pub fn new(connection: MultiplexedConnection, max_delivery_attempts: u32) -> Self {
        Self {
            connection,
            max_delivery_attempts,
        }
    }

    /// Connect using a Redis URL.
    pub async fn connect(url: &str, max_delivery_attempts: u32) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)
            .map_err(|e| QueueError::Backend(format!("Redis open: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)?;
        Ok(Self::new(connection, max_delivery_attempts))
    }

    fn ready_key(queue: &str) -> String {
        format!("queue:{}", queue)
    }

    fn processing_key(queue: &str) -> String {
        format!("queue:{}:processing", queue)
    }

    fn dead_key(queue: &str) -> String {
        format!("queue:{}:dead", queue)
    }

    fn provisioned_key(queue: &str) -> String {
        format!("queue:{}:provisioned", queue)
    }

    fn encode(message: &QueueMessage) -> Result<String, QueueError> {
        serde_json::to_string(message).map_err(|e| QueueError::Serialization(e.to_string()))
    }

    fn decode(raw: &str) -> Result<QueueMessage, QueueError> {
        serde_json::from_str(raw).map_err(|e| QueueError::Serialization(e.to_string()))
    }

    async fn ensure_provisioned(
        &self,
        conn: &mut MultiplexedConnection,
        queue: &str,
    ) -> Result<(), QueueError> {
        let provisioned: bool = conn
            .exists(Self::provisioned_key(queue))
            .await
            .map_err(backend_error)?;
        if provisioned {
            Ok(())
        } else {
            Err(QueueError::NotProvisioned(queue.to_string()))
        }
    }
}

fn backend_error(e: redis::RedisError) -> QueueError {
    QueueError::Backend(format!("Redis error: {}", e))
}

#[async_trait]
impl QueueBroker for RedisQueueBroker {
    async fn provision(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        // Lists materialize on first push; the marker is what makes
        // "provisioned" an observable, idempotent state.
        let _: () = conn
            .set(Self::provisioned_key(queue), 1)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn send(&self, queue: &str, message: QueueMessage) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        self.ensure_provisioned(&mut conn, queue).await?;

        let encoded = Self::encode(&message)?;
        let _: i64 = conn
            .lpush(Self::ready_key(queue), encoded)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn receive_batch(
        &self,
        queue: &str,
        max_count: u32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut conn = self.connection.clone();
        self.ensure_provisioned(&mut conn, queue).await?;

        let ready = Self::ready_key(queue);
        let processing = Self::processing_key(queue);

        let mut batch = Vec::new();
        for _ in 0..max_count {
            // Atomic hand-off: the message is never outside Redis.
            let raw: Option<String> = redis::cmd("LMOVE")
                .arg(&ready)
                .arg(&processing)
                .arg("RIGHT")
                .arg("LEFT")
                .query_async(&mut conn)
                .await
                .map_err(backend_error)?;

            let Some(raw) = raw else {
                break;
            };

            let mut message = Self::decode(&raw)?;
            message.delivery_attempt += 1;

            // Replace the parked entry with the incremented envelope so a
            // later ack/nack can address it by exact value.
            let updated = Self::encode(&message)?;
            let _: i64 = conn
                .lrem(&processing, 1, &raw)
                .await
                .map_err(backend_error)?;
            let _: i64 = conn
                .lpush(&processing, &updated)
                .await
                .map_err(backend_error)?;

            batch.push(message);
        }

        Ok(batch)
    }

    async fn ack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        let encoded = Self::encode(message)?;
        let _: i64 = conn
            .lrem(Self::processing_key(queue), 1, encoded)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn nack(&self, queue: &str, message: &QueueMessage) -> Result<(), QueueError> {
        let mut conn = self.connection.clone();
        let encoded = Self::encode(message)?;

        let removed: i64 = conn
            .lrem(Self::processing_key(queue), 1, &encoded)
            .await
            .map_err(backend_error)?;
        if removed == 0 {
            // Unknown or already settled message; nothing to redeliver.
            return Ok(());
        }

        let target = if message.delivery_attempt >= self.max_delivery_attempts {
            Self::dead_key(queue)
        } else {
            Self::ready_key(queue)
        };
        let _: i64 = conn.lpush(target, encoded).await.map_err(backend_error)?;
        Ok(())
    }

    async fn dead_letters(&self, queue: &str) -> Result<Vec<QueueMessage>, QueueError> {
        let mut conn = self.connection.clone();
        let raw: Vec<String> = conn
            .lrange(Self::dead_key(queue), 0, -1)
            .await
            .map_err(backend_error)?;
        raw.iter().map(|r| Self::decode(r)).collect()
    }
}
