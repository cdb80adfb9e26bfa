//! # Harvest Node
//!
//! Request fulfillment orchestration node with API server.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use harvest_store::{Fixture, InMemoryAuditLog, InMemoryStore};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod coordinator;
mod state;

use config::NodeConfig;
use state::AppState;

/// Run the node server.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    info!("🚀 Harvest Node starting...");

    let store = Arc::new(InMemoryStore::new());
    if let Some(path) = &config.seed_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let fixture = Fixture::from_json(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        info!(records = fixture.len(), "🌱 Loaded seed data from {}", path.display());
        store.load(fixture).await;
    }

    let state = AppState::from_config(&config, store, Arc::new(InMemoryAuditLog::new()))?;

    let app = create_router(state);

    info!("🌐 Listening on http://{}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        .route(
            "/api/v1/requests/:id/orchestrate",
            post(api::requests::orchestrate),
        )
        .route("/api/v1/requests/:id/analysis", get(api::requests::analysis))
        .route(
            "/api/v1/requests/:id/evidence/validate",
            post(api::requests::validate_evidence),
        )
        .route("/api/v1/requests/:id/offers", get(api::requests::list_offers))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::from_env()?;
    init_tracing(&config.log_filter)?;
    run_server(config).await
}
