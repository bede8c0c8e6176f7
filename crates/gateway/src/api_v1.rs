//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/query`                      Answer a question: `{query, student_id?}`
//! - `POST /v1/students/{id}/extractions`  Merge extracted document text into a profile
//! - `GET  /v1/status`                     Backend, catalog and uptime

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use campusfed_core::query::{Answer, Query};
use campusfed_core::student::StudentId;
use campusfed_pipeline::EtlOutcome;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::SharedState;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/students/{id}/extractions", post(extraction_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Query ─────────────────────────────────────────────────────────────────

/// `{response_text}` answers are 200; the `{error}` envelope means the
/// backend cannot serve queries at all, so it is 503.
async fn query_handler(State(state): State<SharedState>, Json(query): Json<Query>) -> (StatusCode, Json<Answer>) {
    info!(query_len = query.text.len(), student_id = ?query.caller, "Query received");

    let answer = state.pipeline.answer(&query).await;
    let status = if answer.is_error() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(answer))
}

// ── Extraction ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractionRequest {
    pub document_type: String,
    #[serde(default)]
    pub extracted_text: String,
}

async fn extraction_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<ExtractionRequest>,
) -> Json<EtlOutcome> {
    info!(student_id = id, document_type = %req.document_type, "Extraction received");
    Json(
        state
            .updater
            .update_profile(StudentId(id), &req.document_type, &req.extracted_text)
            .await,
    )
}

// ── Status ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    provider: String,
    model: String,
    catalog_url: String,
    parallel_tools: bool,
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Json(StatusResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: uptime,
        provider: state.provider.name().into(),
        model: state.config.inference.model.clone(),
        catalog_url: state.config.catalog.base_url.clone(),
        parallel_tools: state.config.pipeline.parallel_tools,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
