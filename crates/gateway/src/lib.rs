//! HTTP API gateway for CampusFed.
//!
//! Exposes a health check and the v1 API: federated queries and document
//! extraction updates.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use tracing::info;

pub use state::{AppState, BoxError, SharedState};

/// Build the full router: `/health` plus the v1 API.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds backend, store, catalog client and pipeline once and shares
/// them across requests.
pub async fn start(config: campusfed_config::AppConfig) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = std::sync::Arc::new(AppState::from_config(config).await?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting with v1 API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
