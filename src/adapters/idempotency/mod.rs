//! Idempotency store adapters.

mod in_memory;
mod redis;

pub use in_memory::InMemoryIdempotencyStore;
pub use redis::RedisIdempotencyStore;
