//! Browser dashboard served over HTTP.
//!
//! Routes:
//! - `GET /` settings form, metrics, charts and the raw data table
//! - `GET /api/population` the same data as JSON
//! - `GET /export.csv` the series as a CSV download
//! - `GET /health` liveness probe

mod error;
mod handlers;
pub mod render;

pub use error::AppError;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tracing::info;

use crate::api::PopulationApi;
use crate::config::DashboardConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn PopulationApi>,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(api: Arc<dyn PopulationApi>, config: DashboardConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/population", get(handlers::population_json))
        .route("/export.csv", get(handlers::export_csv))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Binds `config.addr` and serves the dashboard until Ctrl+C.
pub async fn serve(api: Arc<dyn PopulationApi>, config: DashboardConfig) -> Result<()> {
    let addr = config.addr;
    let app = router(AppState::new(api, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Dashboard listening, open http://{addr}/ in a browser");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
