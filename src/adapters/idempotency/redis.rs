//! Redis-backed idempotency store.
//!
//! Uses `SET key 1 NX EX ttl` so check-and-insert is a single atomic
//! Redis command, which is what lets concurrent webhook handlers agree
//! on exactly one winner per event id. Entries expire after the
//! configured retention window; gateways stop redelivering long before
//! that.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::IdempotencyStore;

const KEY_PREFIX: &str = "payments:webhook-events:";

/// Redis implementation of the `IdempotencyStore` port.
pub struct RedisIdempotencyStore {
    connection: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisIdempotencyStore {
    /// Create a store over an established connection.
    pub fn new(connection: MultiplexedConnection, ttl_secs: u64) -> Self {
        Self {
            connection,
            ttl_secs,
        }
    }

    /// Connect using a Redis URL.
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self, DomainError> {
        let client = redis::Client::open(url)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, format!("Redis open: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| store_error(&e))?;
        Ok(Self::new(connection, ttl_secs))
    }

    fn key(event_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, event_id)
    }
}

fn store_error(e: &redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::InternalError, format!("Redis error: {}", e))
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn insert_if_absent(&self, event_id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        // SET .. NX EX replies OK when the key was written, nil when it
        // already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(event_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error(&e))?;

        Ok(reply.is_some())
    }

    async fn contains(&self, event_id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn
            .exists(Self::key(event_id))
            .await
            .map_err(|e| store_error(&e))?;
        Ok(exists)
    }

    async fn remove(&self, event_id: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        let _: i64 = conn
            .del(Self::key(event_id))
            .await
            .map_err(|e| store_error(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_prefix_and_event_id() {
        assert_eq!(
            RedisIdempotencyStore::key("evt-42"),
            "payments:webhook-events:evt-42"
        );
    }
}
