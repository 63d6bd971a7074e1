//! Health check handler

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health response body
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "ok")]
    pub status: String,

    /// Crate version
    pub version: String,

    /// Seconds since startup
    pub uptime_secs: u64,

    /// Requests handled since startup
    pub requests: u64,

    /// Live sessions
    pub sessions: usize,
}

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    tag = "askdoc",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        requests: state.request_count.load(Ordering::SeqCst),
        sessions: state.session_count().await,
    };

    (StatusCode::OK, Json(response))
}
