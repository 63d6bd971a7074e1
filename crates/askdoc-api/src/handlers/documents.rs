//! Document ingestion handlers
//!
//! Both endpoints run the same pipeline: extract text, chunk, embed, build
//! a fresh index, and publish it to the target session. The previous index
//! is replaced wholesale; conversation history survives unless the caller
//! passes `reset_history`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use askdoc_chat::ChatSession;
use askdoc_core::UploadRecord;
use askdoc_parser::load_documents;
use askdoc_retrieval::{ChunkConfig, Chunker, VectorIndex};

use crate::error::AppError;
use crate::state::AppState;

/// Ingestion response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    /// Outcome status
    #[schema(example = "success")]
    pub status: String,

    /// Human-readable message
    #[schema(example = "PDFs processed successfully")]
    pub message: String,

    /// Number of chunks in the new index
    #[schema(example = 45)]
    pub chunk_count: usize,

    /// Session the index was published to
    pub session_id: Uuid,
}

pub struct IngestOutcome {
    pub chunk_count: usize,
    pub page_estimate: Option<u32>,
}

/// Shared ingestion pipeline for uploads and the bundled document
pub async fn ingest_blobs(
    state: &AppState,
    session: &ChatSession,
    blobs: &[Vec<u8>],
    file_names: Vec<String>,
    reset_history: bool,
) -> Result<IngestOutcome, AppError> {
    let loaded = load_documents(blobs)?;

    let chunker = Chunker::new(ChunkConfig {
        chunk_size: state.config.chat.chunk_size,
        overlap: state.config.chat.chunk_overlap,
    })?;
    let chunks = chunker.chunk_text(&loaded.text);

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = state.clients.embedder.embed_batch(&texts).await?;

    let index = VectorIndex::build(chunks, vectors)?;
    let chunk_count = index.len();
    session.install_index(index, reset_history).await;

    tracing::info!(
        session = %session.id(),
        files = file_names.len(),
        chunks = chunk_count,
        "ingestion complete"
    );

    if let Some(store) = &state.history {
        let record = UploadRecord::new(file_names, loaded.page_estimate, chunk_count);
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record_upload(&record).await {
                tracing::warn!(error = %e, "failed to record upload");
            }
        });
    }

    Ok(IngestOutcome {
        chunk_count,
        page_estimate: loaded.page_estimate,
    })
}

/// Process uploaded PDFs into a fresh index
#[utoipa::path(
    post,
    path = "/process_pdfs",
    tag = "askdoc",
    responses(
        (status = 200, description = "Documents ingested", body = ProcessResponse),
        (status = 400, description = "No files or unreadable document", body = crate::error::ApiError),
        (status = 502, description = "Embedding capability unavailable", body = crate::error::ApiError)
    )
)]
pub async fn process_pdfs(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let mut blobs: Vec<Vec<u8>> = Vec::new();
    let mut file_names: Vec<String> = Vec::new();
    let mut reset_history = false;
    let mut session_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "reset_history" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read field: {e}")))?;
                reset_history = value.trim() == "true";
            }
            "session_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read field: {e}")))?;
                session_id = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| AppError::BadRequest("invalid session_id".to_string()))?,
                );
            }
            _ => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("upload_{}.pdf", blobs.len()));
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file: {e}")))?;
                tracing::info!(file = %file_name, bytes = data.len(), "received upload");
                file_names.push(file_name);
                blobs.push(data.to_vec());
            }
        }
    }

    if blobs.is_empty() {
        return Err(AppError::BadRequest("no files uploaded".to_string()));
    }

    let session = state
        .session(session_id)
        .await
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    let outcome = ingest_blobs(&state, &session, &blobs, file_names, reset_history).await?;

    Ok((
        StatusCode::OK,
        Json(ProcessResponse {
            status: "success".to_string(),
            message: "PDFs processed successfully".to_string(),
            chunk_count: outcome.chunk_count,
            session_id: session.id(),
        }),
    ))
}

/// Query parameters for the default-document endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct LoadDefaultParams {
    /// Target session; the default session when omitted
    pub session_id: Option<Uuid>,

    /// Discard the session's conversation history after publishing
    pub reset_history: Option<bool>,
}

/// Re-ingest the bundled default document
#[utoipa::path(
    get,
    path = "/load_default_pdf",
    tag = "askdoc",
    params(LoadDefaultParams),
    responses(
        (status = 200, description = "Default document ingested", body = ProcessResponse),
        (status = 500, description = "Default document missing", body = crate::error::ApiError)
    )
)]
pub async fn load_default_pdf(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoadDefaultParams>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let path = state.config.chat.default_document.clone();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::Internal(format!("default document {path} unavailable: {e}")))?;

    let session = state
        .session(params.session_id)
        .await
        .ok_or_else(|| AppError::NotFound("session".to_string()))?;

    let outcome = ingest_blobs(
        &state,
        &session,
        &[bytes],
        vec![path],
        params.reset_history.unwrap_or(false),
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(ProcessResponse {
            status: "success".to_string(),
            message: "default document loaded successfully".to_string(),
            chunk_count: outcome.chunk_count,
            session_id: session.id(),
        }),
    ))
}
