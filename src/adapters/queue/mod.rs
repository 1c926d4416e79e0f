//! Queue broker adapters and startup provisioning.

mod in_memory;
mod provisioner;
mod redis;

pub use in_memory::InMemoryQueueBroker;
pub use provisioner::QueueProvisioner;
pub use redis::RedisQueueBroker;
