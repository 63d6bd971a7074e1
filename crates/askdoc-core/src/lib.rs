//! Askdoc Core - Domain models, errors, and shared traits
//!
//! This crate defines the abstractions used throughout the askdoc system:
//! - The pipeline-wide error taxonomy
//! - Document chunk and conversation message models
//! - The completion capability trait
//! - Configuration management
//! - Query-history storage (PostgreSQL)

pub mod config;
pub mod history;

pub use config::{
    AppConfig, ChatConfig, ConfigError, DatabaseConfig, LlmConfig, LlmProvider, ServerConfig,
    TranslateConfig,
};
pub use history::{QueryLogStore, QueryRecord, UploadRecord};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced anywhere in the askdoc pipeline.
///
/// External capabilities (embedding, completion, translation) each get a
/// distinguishable `*Unavailable` variant so callers can decide between
/// failing the request and degrading gracefully.
#[derive(Error, Debug)]
pub enum AskdocError {
    #[error("document could not be read: {0}")]
    UnreadableDocument(String),

    #[error("invalid chunk configuration: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunkConfig { chunk_size: usize, overlap: usize },

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("no document index has been built yet")]
    EmptyIndex,

    #[error("completion service unavailable: {0}")]
    CompletionUnavailable(String),

    #[error("translation service unavailable: {0}")]
    TranslationUnavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AskdocError>;

// ============================================================================
// Document Chunks
// ============================================================================

/// A bounded, overlapping slice of a source document's text.
///
/// Chunks are the unit of retrieval: each one is embedded and indexed, and
/// retrieved chunks become the context block of the completion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier
    pub id: Uuid,

    /// Position within the ingestion batch; retrieval tie-breaks on this
    pub index: u32,

    /// Text content
    pub text: String,
}

impl Chunk {
    pub fn new(index: u32, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            text: text.into(),
        }
    }
}

// ============================================================================
// Conversation Messages
// ============================================================================

/// Who produced a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation. Append-only within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Capability boundary for LLM completion.
///
/// Implementations wrap a hosted completion API; failures (timeout, quota,
/// malformed payload) surface as [`AskdocError::CompletionUnavailable`].
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_construction() {
        let chunk = Chunk::new(3, "some text");
        assert_eq!(chunk.index, 3);
        assert_eq!(chunk.text, "some text");
    }

    #[test]
    fn test_message_roles() {
        let q = Message::user("what is this?");
        let a = Message::assistant("an answer");
        assert_eq!(q.role, Role::User);
        assert_eq!(a.role, Role::Assistant);
        assert_eq!(q.role.to_string(), "user");
    }

    #[test]
    fn test_empty_index_error_message() {
        let err = AskdocError::EmptyIndex;
        assert!(err.to_string().contains("no document index"));
    }

    #[test]
    fn test_invalid_chunk_config_display() {
        let err = AskdocError::InvalidChunkConfig {
            chunk_size: 100,
            overlap: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("overlap"));
    }
}
