//! # Order Service
//!
//! Accepts orders over HTTP, validates items against the catalog behind the `menu_service`
//! breaker and publishes order events through the transactional outbox.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin order-service
//!
//! # Run with specific environment
//! ORDER_PIPELINE_ENV=production cargo run --bin order-service
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use order_pipeline::catalog::{HttpCatalogClient, MenuValidator};
use order_pipeline::config::ConfigManager;
use order_pipeline::constants::MENU_SERVICE_BREAKER;
use order_pipeline::database::{DatabaseConnection, DatabaseMigrations};
use order_pipeline::logging;
use order_pipeline::messaging::{EventBus, PgEventBus};
use order_pipeline::orders::{OrderService, OrderStore, OutboxRelay, PgOrderStore};
use order_pipeline::resilience::CircuitBreaker;
use order_pipeline::web::{order_router, OrderAppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting Order Service...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config_manager = ConfigManager::load().context("failed to load configuration")?;
    let settings = config_manager.config();
    info!("   Environment: {}", config_manager.environment());

    let db = DatabaseConnection::connect(&settings.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    if settings.database.run_migrations {
        DatabaseMigrations::run_all(db.pool())
            .await
            .context("failed to run migrations")?;
    }

    let bus: Arc<dyn EventBus> = Arc::new(PgEventBus::new(
        db.pool().clone(),
        settings.event_bus.partitions,
    ));
    let partitions = bus
        .ensure_topic(&settings.event_bus.topic)
        .await
        .context("failed to create event topic")?;
    info!(topic = %settings.event_bus.topic, partitions, "📡 Event topic ready");

    let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(db.pool().clone()));

    let breaker_config = (&settings.circuit_breaker).into();
    let breaker = Arc::new(CircuitBreaker::new(MENU_SERVICE_BREAKER, breaker_config));
    let validator = if settings.catalog.enabled {
        let client = HttpCatalogClient::new(&settings.catalog, breaker.config().timeout)
            .context("failed to build catalog client")?;
        MenuValidator::new(Arc::new(client), breaker)
    } else {
        warn!("Catalog validation disabled, items will not be checked");
        MenuValidator::disabled(breaker)
    };

    let publish_timeout = settings.order_service.publish_timeout();
    let service = Arc::new(OrderService::new(
        store.clone(),
        bus.clone(),
        validator,
        settings.event_bus.topic.clone(),
        publish_timeout,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay_handle = if settings.outbox.enabled {
        let relay = OutboxRelay::new(
            store,
            bus,
            settings.event_bus.topic.clone(),
            settings.outbox.clone(),
            publish_timeout,
        );
        Some(tokio::spawn(relay.run(shutdown_rx)))
    } else {
        warn!("Outbox relay disabled, unpublished events wait for the next request");
        None
    };

    let listener = TcpListener::bind(&settings.order_service.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.order_service.bind_address))?;
    info!(
        "🎉 Order Service listening on {}",
        settings.order_service.bind_address
    );
    info!("   Press Ctrl+C to shutdown gracefully");

    let app = order_router(OrderAppState::new(service));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("🛑 Shutdown signal received, initiating graceful shutdown...");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = relay_handle {
        if let Err(e) = handle.await {
            error!("Outbox relay task failed: {}", e);
        }
    }
    db.close().await;

    served.context("HTTP server failed")?;
    info!("👋 Order Service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
