//! Natural-language SQL query handler

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use askdoc_core::QueryRecord;
use askdoc_sql::{connect, SqlAssistant, SqlCredentials};

use crate::error::AppError;
use crate::state::AppState;

/// Caller-supplied database connection parameters
#[derive(Debug, Deserialize, ToSchema)]
pub struct SqlCredentialsDto {
    #[schema(example = "root")]
    pub user: String,
    pub password: String,
    #[schema(example = "localhost")]
    pub host: String,
    #[schema(example = 3306)]
    pub port: u16,
    #[schema(example = "chinook")]
    pub database: String,
}

impl From<SqlCredentialsDto> for SqlCredentials {
    fn from(dto: SqlCredentialsDto) -> Self {
        Self {
            user: dto.user,
            password: dto.password,
            host: dto.host,
            port: dto.port,
            database: dto.database,
        }
    }
}

/// SQL question request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct SqlQueryRequest {
    /// Natural-language question about the database
    #[schema(example = "which 3 artists have the most tracks?")]
    pub question: String,

    /// Connection parameters for the caller's database
    pub credentials: SqlCredentialsDto,

    /// Session whose conversational memory the flow shares
    pub session_id: Option<Uuid>,
}

/// SQL answer response body
#[derive(Debug, Serialize, ToSchema)]
pub struct SqlQueryResponse {
    /// Natural-language narration of the query result
    pub response: String,

    /// The SQL query that was executed
    pub sql: String,
}

/// Answer a natural-language question against a caller-specified database
#[utoipa::path(
    post,
    path = "/sql-query",
    tag = "askdoc",
    request_body = SqlQueryRequest,
    responses(
        (status = 200, description = "Query executed and narrated", body = SqlQueryResponse),
        (status = 400, description = "Bad request or connection failure", body = crate::error::ApiError),
        (status = 502, description = "Completion capability unavailable", body = crate::error::ApiError)
    )
)]
pub async fn sql_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SqlQueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("question cannot be empty".to_string()));
    }

    let session = state
        .session(req.session_id)
        .await
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    let credentials: SqlCredentials = req.credentials.into();

    // Connection parameters come from the caller, so a failed connection
    // is their error, not ours
    let pool = connect(&credentials)
        .await
        .map_err(|e| AppError::BadRequest(format!("database connection failed: {e}")))?;

    let history = session.history_window().await;
    let assistant = SqlAssistant::new(state.clients.completion.clone());
    let answer = assistant.answer(&pool, &req.question, &history).await?;

    session.append_turn(&req.question, &answer.response).await;

    if let Some(store) = &state.history {
        let record = QueryRecord::new(session.id(), req.question.clone(), answer.response.clone());
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_query(&record).await {
                tracing::warn!(error = %e, "failed to record query");
            }
        });
    }

    Ok((
        StatusCode::OK,
        Json(SqlQueryResponse {
            response: answer.response,
            sql: answer.sql,
        }),
    ))
}
