//! API error handling
//!
//! External-capability failures are logged with their detailed cause and
//! surfaced to the caller as a generic message; caller-correctable
//! conditions (bad upload, asking before ingestion) map to 4xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// A question arrived before any document index was built
    IndexNotReady,
    NotFound(String),
    /// An external capability (embedding, completion, translation) failed;
    /// the string is the internal detail, never shown to the caller
    UpstreamUnavailable(String),
    Database(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::IndexNotReady => (
                StatusCode::BAD_REQUEST,
                ApiError::new(
                    "INDEX_NOT_READY",
                    "no document index is ready; upload documents first",
                ),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", format!("{msg} not found")),
            ),
            AppError::UpstreamUnavailable(detail) => {
                tracing::error!(detail = %detail, "external capability unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError::new(
                        "UPSTREAM_UNAVAILABLE",
                        "a required external service is unavailable, please retry later",
                    ),
                )
            }
            AppError::Database(detail) => {
                tracing::error!(detail = %detail, "database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "database operation failed"),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("INTERNAL_ERROR", "internal server error"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<askdoc_core::AskdocError> for AppError {
    fn from(err: askdoc_core::AskdocError) -> Self {
        use askdoc_core::AskdocError;

        match err {
            AskdocError::UnreadableDocument(msg) => {
                AppError::BadRequest(format!("document could not be read: {msg}"))
            }
            AskdocError::InvalidChunkConfig { .. } => AppError::BadRequest(err.to_string()),
            AskdocError::EmptyIndex => AppError::IndexNotReady,
            AskdocError::EmbeddingUnavailable(msg) => {
                AppError::UpstreamUnavailable(format!("embedding: {msg}"))
            }
            AskdocError::CompletionUnavailable(msg) => {
                AppError::UpstreamUnavailable(format!("completion: {msg}"))
            }
            AskdocError::TranslationUnavailable(msg) => {
                AppError::UpstreamUnavailable(format!("translation: {msg}"))
            }
            AskdocError::Database(msg) => AppError::Database(msg),
            AskdocError::Config(msg) => AppError::Internal(msg),
            AskdocError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdoc_core::AskdocError;
    use axum::http::StatusCode;

    #[test]
    fn test_empty_index_maps_to_400() {
        let response = AppError::from(AskdocError::EmptyIndex).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_capability_failures_map_to_502() {
        let err = AskdocError::CompletionUnavailable("quota exceeded".to_string());
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unreadable_document_maps_to_400() {
        let err = AskdocError::UnreadableDocument("bad xref".to_string());
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
