//! QueueProvisioner - one-shot startup provisioning.
//!
//! Ensures queue topology exists before receivers or consumers run.
//! The "has this already run" state is an explicit one-shot cell rather
//! than a process-wide boolean: concurrent callers race on the cell,
//! the first performs the work, the rest observe its result.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::ports::{QueueBroker, QueueError};

/// Idempotent, concurrency-safe queue provisioning.
///
/// `ensure_ready` must complete before the webhook receiver or the
/// status processor accept traffic; a failure here is fatal to startup.
pub struct QueueProvisioner {
    broker: Arc<dyn QueueBroker>,
    queue: String,
    ready: OnceCell<()>,
}

impl QueueProvisioner {
    /// Create a provisioner for the given queue.
    pub fn new(broker: Arc<dyn QueueBroker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            ready: OnceCell::new(),
        }
    }

    /// Provision the queue exactly once.
    ///
    /// Safe under concurrent invocation: the first caller provisions,
    /// the others wait and observe the already-provisioned state. A
    /// failed attempt leaves the cell empty so startup retries are
    /// possible, but callers should treat the error as fatal.
    pub async fn ensure_ready(&self) -> Result<(), QueueError> {
        self.ready
            .get_or_try_init(|| async {
                tracing::info!(queue = %self.queue, "Provisioning payment queue");
                self.broker.provision(&self.queue).await
            })
            .await?;
        Ok(())
    }

    /// Whether provisioning has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// The queue this provisioner manages.
    pub fn queue(&self) -> &str {
        &self.queue
    }
}
