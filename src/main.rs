//! Dojang Hub payment pipeline binary.
//!
//! Startup order matters: queue provisioning MUST complete before the
//! webhook receiver or the status processors accept traffic. A
//! provisioning failure aborts the process; payments must never run
//! against a missing queue.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dojang_hub::adapters::gateway::{HttpGatewayClient, HttpGatewayConfig};
use dojang_hub::adapters::http::payments::{live_router, payments_router, PaymentsAppState};
use dojang_hub::adapters::idempotency::RedisIdempotencyStore;
use dojang_hub::adapters::persistence::PostgresPaymentRepository;
use dojang_hub::adapters::queue::{QueueProvisioner, RedisQueueBroker};
use dojang_hub::adapters::websocket::{NotificationHub, WebSocketState};
use dojang_hub::application::{
    CreateCheckoutHandler, GetPaymentStatusHandler, PaymentStatusProcessor, ProcessorConfig,
    WebhookReceiver, WebhookVerifier,
};
use dojang_hub::config::AppConfig;
use dojang_hub::ports::{GatewayClient, IdempotencyStore, PaymentRepository, QueueBroker, StatusPublisher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "Starting Dojang Hub payment pipeline"
    );

    // ── Infrastructure ──────────────────────────────────────────────
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await?;

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let redis_connection = redis_client.get_multiplexed_async_connection().await?;

    let repository: Arc<dyn PaymentRepository> =
        Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let idempotency: Arc<dyn IdempotencyStore> = Arc::new(RedisIdempotencyStore::new(
        redis_connection.clone(),
        config.redis.dedup_ttl_secs,
    ));
    let broker: Arc<dyn QueueBroker> = Arc::new(RedisQueueBroker::new(
        redis_connection,
        config.queue.max_delivery_attempts,
    ));
    let gateway: Arc<dyn GatewayClient> = Arc::new(HttpGatewayClient::new(
        HttpGatewayConfig::from_config(&config.gateway),
    ));

    let hub = Arc::new(NotificationHub::with_default_capacity());
    let publisher: Arc<dyn StatusPublisher> = hub.clone();

    // ── Queue topology before anything consumes or enqueues ────────
    let provisioner = QueueProvisioner::new(broker.clone(), config.queue.payment_queue.clone());
    provisioner.ensure_ready().await.map_err(|e| {
        tracing::error!(error = %e, "Queue provisioning failed; refusing to start");
        e
    })?;

    // ── Consumers ──────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = Vec::new();
    for worker in 0..config.queue.worker_count {
        let processor = PaymentStatusProcessor::new(
            repository.clone(),
            broker.clone(),
            publisher.clone(),
            ProcessorConfig::from_queue_config(&config.queue),
        );
        let shutdown_rx = shutdown_rx.clone();
        workers.push(tokio::spawn(async move {
            if let Err(e) = processor.run(shutdown_rx).await {
                tracing::error!(worker, error = %e, "Status processor stopped with error");
            } else {
                tracing::info!(worker, "Status processor stopped");
            }
        }));
    }

    // ── HTTP surface ───────────────────────────────────────────────
    let mut receiver = WebhookReceiver::new(
        idempotency,
        broker.clone(),
        config.queue.payment_queue.clone(),
    );
    if let Some(secret) = &config.gateway.webhook_secret {
        receiver = receiver.with_verifier(WebhookVerifier::new(secret.clone()));
    }

    let state = PaymentsAppState {
        checkout: Arc::new(CreateCheckoutHandler::new(
            gateway,
            repository.clone(),
            config.gateway.currency.clone(),
            config.gateway.notification_url.clone(),
        )),
        status: Arc::new(GetPaymentStatusHandler::new(repository)),
        receiver: Arc::new(receiver),
    };

    let cors = {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
    };

    let app = payments_router()
        .with_state(state)
        .merge(live_router(WebSocketState::new(hub)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Drain the consumers before exiting.
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    Ok(())
}
