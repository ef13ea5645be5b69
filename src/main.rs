//! mutual-gateway server entry point.
//!
//! Loads configuration, selects the store, and starts the Axum HTTP server
//! with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mutual_gateway::app_state::AppState;
use mutual_gateway::build_app;
use mutual_gateway::config::GatewayConfig;
use mutual_gateway::domain::{PresenceHub, UserId};
use mutual_gateway::persistence::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(addr = %config.listen_addr, "starting mutual-gateway");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using the development secret");
    }

    // Select the store
    let store: Arc<dyn Store> = if config.persistence_enabled {
        let postgres = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        if config.run_migrations {
            postgres.migrate().await.context("running migrations")?;
            tracing::info!("migrations applied");
        }
        Arc::new(postgres)
    } else {
        tracing::warn!(
            seed_users = config.seed_users,
            "persistence disabled; using the in-memory store"
        );
        Arc::new(MemoryStore::with_users(
            (1..=config.seed_users).map(UserId::new),
        ))
    };

    // Build application
    let listen_addr = config.listen_addr;
    let hub = Arc::new(PresenceHub::new());
    let app = build_app(AppState::new(store, hub, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
