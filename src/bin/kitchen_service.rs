//! # Kitchen Service
//!
//! Consumes the order-events topic as the kitchen consumer group, keeps the kitchen queue
//! and serves it to kitchen staff over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin kitchen-service
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use order_pipeline::config::ConfigManager;
use order_pipeline::database::{DatabaseConnection, DatabaseMigrations};
use order_pipeline::kitchen::{KitchenService, KitchenStore, PgKitchenStore};
use order_pipeline::logging;
use order_pipeline::messaging::{EventBus, PgEventBus, Subscription};
use order_pipeline::web::{kitchen_router, KitchenAppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting Kitchen Service...");
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
    let store: Arc<dyn KitchenStore> = Arc::new(PgKitchenStore::new(db.pool().clone()));
    let kitchen = Arc::new(KitchenService::new(store));

    let topic = &settings.event_bus.topic;
    let group = &settings.kitchen_service.consumer_group;
    let subscription = Subscription::start(
        bus,
        topic,
        group,
        Arc::new(kitchen.projector()),
        settings.kitchen_service.consumer.clone(),
    )
    .await
    .context("failed to start kitchen consumer")?;

    let listener = TcpListener::bind(&settings.kitchen_service.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.kitchen_service.bind_address))?;
    info!(
        "🎉 Kitchen Service listening on {}",
        settings.kitchen_service.bind_address
    );
    info!("   Press Ctrl+C to shutdown gracefully");

    let app = kitchen_router(KitchenAppState::new(kitchen, topic.clone(), group.clone()));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("🛑 Shutdown signal received, stopping consumer...");
    subscription.shutdown().await;
    db.close().await;

    served.context("HTTP server failed")?;
    info!("👋 Kitchen Service shutdown complete");
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
