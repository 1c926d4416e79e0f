//! PaymentStatusProcessor - the queue consumer that owns the idempotent
//! state machine.
//!
//! One or more processor workers compete on the payment queue. The
//! broker guarantees at-least-once delivery and nothing about order, so
//! every decision here assumes duplication and reordering:
//!
//! 1. Look the record up by gateway payment id, falling back to the
//!    checkout reference. A missing record is nacked (the
//!    preference-creation write may not be visible yet) and eventually
//!    dead-letters.
//! 2. An event older than the record's `last_updated_at` is stale:
//!    acked and discarded.
//! 3. The event's status string maps to a target state; events without
//!    usable status information are acked as no-ops.
//! 4. An illegal transition is an anomaly (gateway bug or fraud
//!    signal): logged, acked, record untouched.
//! 5. A legal transition persists through one conditional update; the
//!    losing side of a concurrent race observes `Stale` and acks.
//! 6. Only an applied update publishes to the notification hub, and a
//!    publish failure never fails the message - persistence and
//!    notification have independent failure domains.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::config::QueueConfig;
use crate::domain::foundation::StateMachine;
use crate::domain::payment::{PaymentStatus, StatusChange, WebhookError, WebhookEvent};
use crate::ports::{
    PaymentRepository, QueueBroker, QueueError, QueueMessage, StatusPublisher, StatusUpdate,
    UpdateOutcome,
};

/// Configuration for the processor loop.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Queue to consume from.
    pub queue: String,

    /// Max messages pulled per poll.
    pub batch_size: u32,

    /// Sleep between polls when idle.
    pub poll_interval: Duration,

    /// Bound on a single message's processing time; exceeding it nacks.
    pub processing_timeout: Duration,
}

impl ProcessorConfig {
    /// Build from the application queue configuration.
    pub fn from_queue_config(config: &QueueConfig) -> Self {
        Self {
            queue: config.payment_queue.clone(),
            batch_size: config.receive_batch_size,
            poll_interval: config.poll_interval(),
            processing_timeout: config.processing_timeout(),
        }
    }
}

/// How one event was settled against the record.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The record was mutated and the update is worth pushing.
    Applied(StatusUpdate),

    /// Event carried no recognizable status; nothing to do.
    NoStatusInfo,

    /// Event targets the status the record already has.
    NoChange,

    /// Event is older than the record (or lost the persistence race).
    Stale,

    /// Event asked for a transition the state table forbids.
    IllegalTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// The queue consumer applying webhook events to payment records.
pub struct PaymentStatusProcessor {
    repository: Arc<dyn PaymentRepository>,
    broker: Arc<dyn QueueBroker>,
    publisher: Arc<dyn StatusPublisher>,
    config: ProcessorConfig,
}

impl PaymentStatusProcessor {
    /// Create a processor over the given ports.
    pub fn new(
        repository: Arc<dyn PaymentRepository>,
        broker: Arc<dyn QueueBroker>,
        publisher: Arc<dyn StatusPublisher>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            repository,
            broker,
            publisher,
            config,
        }
    }

    /// Run the consumer loop until the shutdown signal flips.
    ///
    /// Completes the in-flight batch before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), QueueError> {
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.poll_once().await?;
                        return Ok(());
                    }
                }

                _ = interval.tick() => {
                    self.poll_once().await?;
                }
            }
        }
    }

    /// Receive and settle one batch. Returns the number of messages
    /// pulled. Also the unit tests' entry point.
    pub async fn poll_once(&self) -> Result<usize, QueueError> {
        let batch = self
            .broker
            .receive_batch(&self.config.queue, self.config.batch_size)
            .await?;
        let count = batch.len();

        for message in batch {
            self.settle(message).await?;
        }

        Ok(count)
    }

    /// Process one message and ack or nack it accordingly.
    async fn settle(&self, message: QueueMessage) -> Result<(), QueueError> {
        let event_id = message.payload.external_event_id.clone();

        let result = time::timeout(
            self.config.processing_timeout,
            self.process(&message.payload),
        )
        .await;

        match result {
            Err(_elapsed) => {
                tracing::warn!(
                    event_id = %event_id,
                    attempt = message.delivery_attempt,
                    "Processing timed out; message will be redelivered"
                );
                self.broker.nack(&self.config.queue, &message).await
            }

            Ok(Err(e)) if e.is_retryable() => {
                tracing::warn!(
                    event_id = %event_id,
                    attempt = message.delivery_attempt,
                    error = %e,
                    "Transient processing failure; message will be redelivered"
                );
                self.broker.nack(&self.config.queue, &message).await
            }

            Ok(Err(e)) => {
                // Non-retryable processing errors are acked so they
                // cannot loop as poison messages.
                tracing::error!(event_id = %event_id, error = %e, "Dropping unprocessable event");
                self.broker.ack(&self.config.queue, &message).await
            }

            Ok(Ok(outcome)) => {
                self.broker.ack(&self.config.queue, &message).await?;
                self.report(&event_id, outcome).await;
                Ok(())
            }
        }
    }

    /// Log the outcome and push applied updates to subscribers.
    async fn report(&self, event_id: &str, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Applied(update) => {
                tracing::info!(
                    event_id = %event_id,
                    reference = %update.external_reference,
                    status = %update.status,
                    "Payment status updated"
                );
                // Fire-and-forget: a push failure never disturbs the
                // already-acked message.
                if let Err(e) = self.publisher.publish(update).await {
                    tracing::warn!(event_id = %event_id, error = %e, "Status push failed");
                }
            }
            ProcessOutcome::NoStatusInfo => {
                tracing::debug!(event_id = %event_id, "Event carried no status information");
            }
            ProcessOutcome::NoChange => {
                tracing::debug!(event_id = %event_id, "Event matched current status");
            }
            ProcessOutcome::Stale => {
                tracing::debug!(event_id = %event_id, "Discarded stale event");
            }
            ProcessOutcome::IllegalTransition { from, to } => {
                tracing::warn!(
                    event_id = %event_id,
                    from = %from,
                    to = %to,
                    "Anomaly: gateway requested illegal status transition"
                );
            }
        }
    }

    /// Apply one webhook event to its payment record.
    ///
    /// Pure pipeline logic; acking and pushing happen in `settle`.
    pub async fn process(&self, event: &WebhookEvent) -> Result<ProcessOutcome, WebhookError> {
        // 1. Locate the record.
        let record = self.find_record(event).await?;

        // 2. Ordering: drop events older than the record.
        if record.is_stale(&event.provider_created_at) {
            return Ok(ProcessOutcome::Stale);
        }

        // 3. Map the event to a target status.
        let Some(target) = event.target_status() else {
            if let Some(raw) = &event.status {
                tracing::warn!(
                    event_id = %event.external_event_id,
                    status = %raw,
                    "Ignoring unrecognized gateway status"
                );
            }
            return Ok(ProcessOutcome::NoStatusInfo);
        };

        if target == record.status {
            return Ok(ProcessOutcome::NoChange);
        }

        // 4. Legality against the state table.
        if !record.status.can_transition_to(&target) {
            return Ok(ProcessOutcome::IllegalTransition {
                from: record.status,
                to: target,
            });
        }

        // 5. Persist through the conditional update.
        let change = StatusChange {
            payment_id: record.id,
            external_payment_id: Some(event.external_payment_id.clone()),
            new_status: target,
            status_detail: event.status_detail.clone(),
            effective_at: event.provider_created_at,
        };

        match self
            .repository
            .update_if_newer(&change)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            UpdateOutcome::Applied => Ok(ProcessOutcome::Applied(StatusUpdate::new(
                record.external_reference,
                target,
                change.status_detail,
                change.effective_at,
            ))),
            UpdateOutcome::Stale => Ok(ProcessOutcome::Stale),
            UpdateOutcome::NotFound => Err(WebhookError::PaymentNotFound),
        }
    }

    async fn find_record(
        &self,
        event: &WebhookEvent,
    ) -> Result<crate::domain::payment::PaymentRecord, WebhookError> {
        if let Some(record) = self
            .repository
            .find_by_external_payment_id(&event.external_payment_id)
            .await
            .map_err(|e| WebhookError::Database(e.to_string()))?
        {
            return Ok(record);
        }

        if let Some(reference) = &event.external_reference {
            if let Some(record) = self
                .repository
                .find_by_reference(reference)
                .await
                .map_err(|e| WebhookError::Database(e.to_string()))?
            {
                return Ok(record);
            }
        }

        Err(WebhookError::PaymentNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryPaymentRepository;
    use crate::adapters::queue::InMemoryQueueBroker;
    use crate::domain::foundation::{DomainError, ExternalReference, Timestamp};
    use crate::domain::payment::{PaymentRecord, WebhookEventBuilder};
    use std::sync::Mutex;

    const QUEUE: &str = "payment-status";

    /// Publisher that records every update (and can be made to fail).
    struct RecordingPublisher {
        updates: Mutex<Vec<StatusUpdate>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn updates(&self) -> Vec<StatusUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl StatusPublisher for RecordingPublisher {
        async fn publish(&self, update: StatusUpdate) -> Result<(), DomainError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(DomainError::new(
                    crate::domain::foundation::ErrorCode::InternalError,
                    "push transport down",
                ));
            }
            self.updates.lock().unwrap().push(update);
            Ok(())
        }
    }

    struct Fixture {
        repository: Arc<InMemoryPaymentRepository>,
        broker: Arc<InMemoryQueueBroker>,
        publisher: Arc<RecordingPublisher>,
        processor: PaymentStatusProcessor,
    }

    async fn fixture(max_attempts: u32) -> Fixture {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let broker = Arc::new(InMemoryQueueBroker::new(max_attempts));
        broker.provision(QUEUE).await.unwrap();
        let publisher = Arc::new(RecordingPublisher::new());

        let processor = PaymentStatusProcessor::new(
            repository.clone(),
            broker.clone(),
            publisher.clone(),
            ProcessorConfig {
                queue: QUEUE.to_string(),
                batch_size: 16,
                poll_interval: Duration::from_millis(10),
                processing_timeout: Duration::from_secs(5),
            },
        );

        Fixture {
            repository,
            broker,
            publisher,
            processor,
        }
    }

    async fn seed_record(fixture: &Fixture, reference: &str) -> PaymentRecord {
        let mut record = PaymentRecord::new_pending(
            ExternalReference::from_string(reference),
            10_000,
            "ARS",
            "a@x.com",
        )
        .unwrap();
        // Anchor timestamps well in the past so event times are newer.
        record.created_at = Timestamp::from_unix_secs(1_600_000_000);
        record.last_updated_at = Timestamp::from_unix_secs(1_600_000_000);
        fixture.repository.insert(&record).await.unwrap();
        record
    }

    // ══════════════════════════════════════════════════════════════
    // process() Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn approval_event_is_applied_and_persisted() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        let event = WebhookEventBuilder::new()
            .payment_id("pay-1")
            .reference("ref-1")
            .status("approved")
            .status_detail("accredited")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();

        let outcome = f.processor.process(&event).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Applied(_)));
        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Approved);
        assert_eq!(stored.status_detail.as_deref(), Some("accredited"));
        assert_eq!(stored.external_payment_id.as_deref(), Some("pay-1"));
        assert_eq!(
            stored.last_updated_at,
            Timestamp::from_unix_secs(1_700_000_000)
        );
    }

    #[tokio::test]
    async fn lookup_falls_back_to_reference_before_payment_id_is_known() {
        let f = fixture(5).await;
        seed_record(&f, "ref-fallback").await;

        // Record has no external_payment_id yet; only the reference matches.
        let event = WebhookEventBuilder::new()
            .payment_id("pay-new")
            .reference("ref-fallback")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();

        let outcome = f.processor.process(&event).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::Applied(_)));

        // Later events can find the record by payment id alone.
        let found = f
            .repository
            .find_by_external_payment_id("pay-new")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn missing_record_is_a_retryable_error() {
        let f = fixture(5).await;

        let event = WebhookEventBuilder::new()
            .payment_id("pay-ghost")
            .status("approved")
            .build();

        let result = f.processor.process(&event).await;
        match result {
            Err(e) => assert!(e.is_retryable()),
            Ok(_) => panic!("Expected PaymentNotFound"),
        }
    }

    #[tokio::test]
    async fn stale_event_is_discarded_without_mutation() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        // Move the record forward first.
        let approve = WebhookEventBuilder::new()
            .event_id("evt-approve")
            .payment_id("pay-1")
            .reference("ref-1")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();
        f.processor.process(&approve).await.unwrap();

        // A late-arriving older event must not win.
        let stale = WebhookEventBuilder::new()
            .event_id("evt-stale")
            .payment_id("pay-1")
            .status("rejected")
            .created_at(Timestamp::from_unix_secs(1_600_500_000))
            .build();
        let outcome = f.processor.process(&stale).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Stale));
        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn creation_event_without_status_is_a_noop() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        let event = WebhookEventBuilder::new()
            .action("payment.created")
            .payment_id("pay-1")
            .reference("ref-1")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();

        let outcome = f.processor.process(&event).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::NoStatusInfo));
        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn refund_against_pending_record_is_an_anomaly() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        let event = WebhookEventBuilder::new()
            .payment_id("pay-1")
            .reference("ref-1")
            .status("refunded")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();

        let outcome = f.processor.process(&event).await.unwrap();

        assert!(matches!(
            outcome,
            ProcessOutcome::IllegalTransition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Refunded,
            }
        ));
        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn second_approval_event_is_no_change() {
        let f = fixture(5).await;
        seed_record(&f, "ref-1").await;

        let first = WebhookEventBuilder::new()
            .event_id("evt-1")
            .payment_id("pay-1")
            .reference("ref-1")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();
        f.processor.process(&first).await.unwrap();

        let second = WebhookEventBuilder::new()
            .event_id("evt-2")
            .payment_id("pay-1")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_100))
            .build();
        let outcome = f.processor.process(&second).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::NoChange));
    }

    #[tokio::test]
    async fn approved_payment_can_be_refunded() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        let approve = WebhookEventBuilder::new()
            .event_id("evt-1")
            .payment_id("pay-1")
            .reference("ref-1")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();
        f.processor.process(&approve).await.unwrap();

        let refund = WebhookEventBuilder::new()
            .event_id("evt-2")
            .payment_id("pay-1")
            .status("refunded")
            .created_at(Timestamp::from_unix_secs(1_700_000_500))
            .build();
        let outcome = f.processor.process(&refund).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Applied(_)));
        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Refunded);
    }

    // ══════════════════════════════════════════════════════════════
    // poll_once() / Queue Interaction Tests
    // ══════════════════════════════════════════════════════════════

    async fn enqueue(f: &Fixture, event: WebhookEvent) {
        f.broker
            .send(QUEUE, QueueMessage::new(event))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn applied_update_is_acked_and_published() {
        let f = fixture(5).await;
        seed_record(&f, "ref-1").await;

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .payment_id("pay-1")
                .reference("ref-1")
                .status("approved")
                .created_at(Timestamp::from_unix_secs(1_700_000_000))
                .build(),
        )
        .await;

        let count = f.processor.poll_once().await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(f.broker.ready_len(QUEUE), 0);
        assert_eq!(f.broker.in_flight_len(QUEUE), 0);

        let updates = f.publisher.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, PaymentStatus::Approved);
        assert_eq!(updates[0].external_reference.as_str(), "ref-1");
    }

    #[tokio::test]
    async fn missing_record_nacks_until_dead_letter() {
        let f = fixture(2).await;

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .event_id("evt-orphan")
                .payment_id("pay-ghost")
                .status("approved")
                .build(),
        )
        .await;

        // Two attempts, both nacked, then dead-lettered.
        f.processor.poll_once().await.unwrap();
        f.processor.poll_once().await.unwrap();

        assert_eq!(f.broker.ready_len(QUEUE), 0);
        let dead = f.broker.dead_letters(QUEUE).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].payload.external_event_id, "evt-orphan");
        assert!(f.publisher.updates().is_empty());
    }

    #[tokio::test]
    async fn record_arriving_between_retries_recovers_the_message() {
        let f = fixture(5).await;

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .payment_id("pay-late")
                .reference("ref-late")
                .status("approved")
                .created_at(Timestamp::from_unix_secs(1_700_000_000))
                .build(),
        )
        .await;

        // First attempt: record not there yet, message nacked.
        f.processor.poll_once().await.unwrap();
        assert_eq!(f.broker.ready_len(QUEUE), 1);

        // The preference-creation write becomes visible.
        seed_record(&f, "ref-late").await;

        // Redelivery succeeds.
        f.processor.poll_once().await.unwrap();
        assert_eq!(f.broker.ready_len(QUEUE), 0);
        assert_eq!(f.publisher.updates().len(), 1);
    }

    #[tokio::test]
    async fn illegal_transition_is_acked_not_redelivered() {
        let f = fixture(5).await;
        seed_record(&f, "ref-1").await;

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .payment_id("pay-1")
                .reference("ref-1")
                .status("charged_back")
                .created_at(Timestamp::from_unix_secs(1_700_000_000))
                .build(),
        )
        .await;

        f.processor.poll_once().await.unwrap();

        assert_eq!(f.broker.ready_len(QUEUE), 0);
        assert!(f.broker.dead_letters(QUEUE).await.unwrap().is_empty());
        assert!(f.publisher.updates().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_message() {
        let f = fixture(5).await;
        seed_record(&f, "ref-1").await;
        f.publisher
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .payment_id("pay-1")
                .reference("ref-1")
                .status("approved")
                .created_at(Timestamp::from_unix_secs(1_700_000_000))
                .build(),
        )
        .await;

        f.processor.poll_once().await.unwrap();

        // Message settled despite the push failure; no redelivery.
        assert_eq!(f.broker.ready_len(QUEUE), 0);
        assert!(f.broker.dead_letters(QUEUE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn redelivery_after_crash_reaches_same_final_state() {
        let f = fixture(5).await;
        let record = seed_record(&f, "ref-1").await;

        let event = WebhookEventBuilder::new()
            .payment_id("pay-1")
            .reference("ref-1")
            .status("approved")
            .created_at(Timestamp::from_unix_secs(1_700_000_000))
            .build();

        // First delivery processed but "crash" before ack: simulate by
        // processing the payload directly, then redelivering the message.
        f.processor.process(&event).await.unwrap();

        enqueue(&f, event).await;
        f.processor.poll_once().await.unwrap();

        let stored = f.repository.get(&record.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Approved);
        // The redelivery observed NoChange, so it pushed nothing.
        assert!(f.publisher.updates().is_empty());
        assert_eq!(f.broker.ready_len(QUEUE), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let f = fixture(5).await;
        seed_record(&f, "ref-1").await;

        enqueue(
            &f,
            WebhookEventBuilder::new()
                .payment_id("pay-1")
                .reference("ref-1")
                .status("approved")
                .created_at(Timestamp::from_unix_secs(1_700_000_000))
                .build(),
        )
        .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let processor = f.processor;
        let handle = tokio::spawn(async move { processor.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(f.broker.ready_len(QUEUE), 0);
        assert_eq!(f.publisher.updates().len(), 1);
    }
}
