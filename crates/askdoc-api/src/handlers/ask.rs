//! Question-answering handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use askdoc_core::QueryRecord;

use crate::error::AppError;
use crate::state::AppState;

/// Question request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct AskRequest {
    /// The user's question, in any language
    #[schema(example = "What is the capital of France?")]
    pub question: String,

    /// Target session; the default session when omitted
    pub session_id: Option<Uuid>,
}

/// Answer response body
#[derive(Debug, Serialize, ToSchema)]
pub struct AskResponse {
    /// Generated answer, translated back to the question's language when
    /// translation is configured
    pub response: String,
}

/// Answer a question against the session's active index
#[utoipa::path(
    post,
    path = "/ask_question",
    tag = "askdoc",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponse),
        (status = 400, description = "Empty question or no index ready", body = crate::error::ApiError),
        (status = 404, description = "Unknown session", body = crate::error::ApiError),
        (status = 502, description = "Capability unavailable", body = crate::error::ApiError)
    )
)]
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("question cannot be empty".to_string()));
    }

    let session = state
        .session(req.session_id)
        .await
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    tracing::info!(session = %session.id(), "processing question");
    let answer = session.ask(&req.question).await?;

    if let Some(store) = &state.history {
        let record = QueryRecord::new(session.id(), req.question.clone(), answer.clone());
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_query(&record).await {
                tracing::warn!(error = %e, "failed to record query");
            }
        });
    }

    Ok((StatusCode::OK, Json(AskResponse { response: answer })))
}
