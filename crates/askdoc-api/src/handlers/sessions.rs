//! Session management handlers
//!
//! Sessions scope conversational state. Requests that name no session use
//! the default one, so single-tenant callers never need these endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use askdoc_chat::SessionState;

use crate::error::AppError;
use crate::state::AppState;

/// New-session response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Identifier to pass as `session_id` in later requests
    pub session_id: Uuid,
}

/// Session state response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub session_id: Uuid,

    /// `uninitialized`, `ready`, or `answering`
    #[schema(example = "ready")]
    pub state: String,

    /// Completed question/answer turns
    pub turns: usize,

    /// Chunks in the active index, absent before the first ingestion
    pub chunk_count: Option<usize>,
}

/// Create an independent conversation session
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "askdoc",
    responses(
        (status = 201, description = "Session created", body = SessionResponse)
    )
)]
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.increment_requests();

    let session = state.create_session().await;
    tracing::info!(session = %session.id(), "session created");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id(),
        }),
    )
}

/// Inspect a session's state
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "askdoc",
    params(
        ("id" = Uuid, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Session state", body = SessionInfo),
        (status = 404, description = "Unknown session", body = crate::error::ApiError)
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let session = state
        .session(Some(id))
        .await
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    let session_state = match session.state().await {
        SessionState::Uninitialized => "uninitialized",
        SessionState::Ready => "ready",
        SessionState::Answering => "answering",
    };

    Ok((
        StatusCode::OK,
        Json(SessionInfo {
            session_id: session.id(),
            state: session_state.to_string(),
            turns: session.turn_count().await,
            chunk_count: session.index_len().await,
        }),
    ))
}
