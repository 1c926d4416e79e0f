//! Queue configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Queue configuration for the payment status pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Name of the payment status queue
    #[serde(default = "default_queue_name")]
    pub payment_queue: String,

    /// Deliveries before a message is dead-lettered
    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,

    /// Maximum messages pulled per receive call
    #[serde(default = "default_receive_batch_size")]
    pub receive_batch_size: u32,

    /// Consumer poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-message processing timeout in seconds
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_secs: u64,

    /// Number of competing consumer workers
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
}

impl QueueConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get processing timeout as Duration
    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }

    /// Name of the dead-letter queue derived from the payment queue
    pub fn dead_letter_queue(&self) -> String {
        format!("{}.dead", self.payment_queue)
    }

    /// Validate queue configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.payment_queue.is_empty() {
            return Err(ValidationError::EmptyQueueName);
        }
        if self.max_delivery_attempts == 0 {
            return Err(ValidationError::InvalidMaxDeliveryAttempts);
        }
        if self.processing_timeout_secs == 0 || self.processing_timeout_secs > 300 {
            return Err(ValidationError::InvalidProcessingTimeout);
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            payment_queue: default_queue_name(),
            max_delivery_attempts: default_max_delivery_attempts(),
            receive_batch_size: default_receive_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
            processing_timeout_secs: default_processing_timeout(),
            worker_count: default_worker_count(),
        }
    }
}

fn default_queue_name() -> String {
    "payment-status".to_string()
}

fn default_max_delivery_attempts() -> u32 {
    5
}

fn default_receive_batch_size() -> u32 {
    16
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_processing_timeout() -> u64 {
    10
}

fn default_worker_count() -> u32 {
    2
}
