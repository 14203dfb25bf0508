//! Clinic billing server.
//!
//! Loads configuration, connects to PostgreSQL, wires the PayPal gateway and
//! the billing services, then serves the REST API while the webhook workers
//! and the scheduler run in the background. SIGINT/SIGTERM stops accepting
//! requests, lets the workers drain the queue, and exits.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clinic_billing::adapters::alerting::TracingAlertSink;
use clinic_billing::adapters::catalog::PlanTierCatalog;
use clinic_billing::adapters::collaborators::{HttpDirectoryClient, HttpNotificationSender};
use clinic_billing::adapters::http::{billing_router, BillingAppState};
use clinic_billing::adapters::paypal::PayPalClient;
use clinic_billing::adapters::postgres::{
    PostgresBillingAuditLog, PostgresPaymentOrderRepository, PostgresPaymentTransactionLog,
    PostgresSubscriptionRepository, PostgresTenantCredentialStore, PostgresWebhookEventRepository,
};
use clinic_billing::application::webhooks::{WebhookIngestor, WebhookWorkerPool};
use clinic_billing::application::{
    BillingMetrics, BillingPorts, BillingScheduler, BillingServices, BillingSettings,
    SchedulerIntervals,
};
use clinic_billing::config::{AppConfig, ServerConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        gateway_mode = ?config.gateway.mode,
        "Starting clinic billing"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let ttl = config.billing.catalog_cache_ttl();
    let catalog = match &config.billing.plan_catalog_path {
        Some(path) => PlanTierCatalog::from_path(path, ttl)?,
        None => PlanTierCatalog::embedded(ttl)?,
    };

    let tenant_credentials = Arc::new(PostgresTenantCredentialStore::new(pool.clone()));
    let gateway = PayPalClient::new(&config.gateway, Some(tenant_credentials), shutdown_rx.clone())?;

    let ports = BillingPorts {
        orders: Arc::new(PostgresPaymentOrderRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        audit: Arc::new(PostgresBillingAuditLog::new(pool.clone())),
        transactions: Arc::new(PostgresPaymentTransactionLog::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        gateway: Arc::new(gateway),
        directory: Arc::new(HttpDirectoryClient::new(&config.collaborators)?),
        notifier: Arc::new(HttpNotificationSender::new(&config.collaborators)?),
        catalog: Arc::new(catalog),
        alerts: Arc::new(TracingAlertSink::new()),
    };
    let metrics = Arc::new(BillingMetrics::new()?);
    let services = BillingServices::build(ports, metrics, BillingSettings::from_config(&config)?);

    let (queue, workers) = WebhookWorkerPool::start(
        &config.webhooks,
        services.dispatcher.clone(),
        services.monitor.clone(),
        shutdown_rx.clone(),
    );
    let ingestor = Arc::new(WebhookIngestor::new(
        services.gateway.clone(),
        config.gateway.webhook_id.clone(),
        services.monitor.clone(),
        queue,
    ));

    let scheduler = BillingScheduler::new(
        services.monitor.clone(),
        services.subscriptions.clone(),
        services.orders.clone(),
        services.gateway.clone(),
        services.webhook_events.clone(),
        SchedulerIntervals::from_config(&config.scheduler, &config.alerting, &config.webhooks),
    );
    let scheduler_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let app = billing_router(
        BillingAppState::new(services, ingestor),
        config.server.request_timeout(),
    );
    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    let mut server_shutdown = shutdown_rx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    if tokio::time::timeout(config.server.shutdown_grace(), workers.join()).await.is_err() {
        tracing::warn!("Webhook workers still busy after the shutdown grace period");
    }
    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "Scheduler task panicked");
    }
    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// JSON or human-readable lines per `server.json_logs`. `RUST_LOG` wins
/// over the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.log_as_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
