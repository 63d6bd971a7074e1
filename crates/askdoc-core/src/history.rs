//! PostgreSQL query-history store
//!
//! Persists upload events and question/answer turns. The store is optional:
//! when no database is configured the service runs without history, and
//! recording failures are logged rather than failing the request that
//! triggered them.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::{AskdocError, Result};

/// Query-history store backed by PostgreSQL
#[derive(Clone)]
pub struct QueryLogStore {
    pool: PgPool,
}

/// A recorded document upload
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub id: Uuid,
    pub file_names: Vec<String>,
    pub page_estimate: Option<i32>,
    pub chunk_count: i32,
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn new(file_names: Vec<String>, page_estimate: Option<u32>, chunk_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_names,
            page_estimate: page_estimate.map(|p| p as i32),
            chunk_count: chunk_count as i32,
            created_at: Utc::now(),
        }
    }
}

/// A recorded question/answer turn
#[derive(Debug, Clone, FromRow)]
pub struct QueryRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(session_id: Uuid, question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            question: question.into(),
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

impl QueryLogStore {
    /// Connect to the history database
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| AskdocError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uploads (
                id UUID PRIMARY KEY,
                file_names TEXT[] NOT NULL,
                page_estimate INTEGER,
                chunk_count INTEGER NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AskdocError::Database(format!("failed to create uploads table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queries (
                id UUID PRIMARY KEY,
                session_id UUID NOT NULL,
                question TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AskdocError::Database(format!("failed to create queries table: {e}")))?;

        Ok(())
    }

    /// Record a document upload
    pub async fn record_upload(&self, record: &UploadRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO uploads (id, file_names, page_estimate, chunk_count, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(&record.file_names)
        .bind(record.page_estimate)
        .bind(record.chunk_count)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AskdocError::Database(format!("failed to record upload: {e}")))?;

        Ok(())
    }

    /// Record a question/answer turn
    pub async fn record_query(&self, record: &QueryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO queries (id, session_id, question, response, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(record.session_id)
        .bind(&record.question)
        .bind(&record.response)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AskdocError::Database(format!("failed to record query: {e}")))?;

        Ok(())
    }

    /// Most recent turns for a session, newest first
    pub async fn recent_queries(&self, session_id: Uuid, limit: i64) -> Result<Vec<QueryRecord>> {
        let records = sqlx::query_as::<_, QueryRecord>(
            "SELECT id, session_id, question, response, created_at
             FROM queries WHERE session_id = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AskdocError::Database(format!("failed to load query history: {e}")))?;

        Ok(records)
    }

    /// Total recorded turns across all sessions
    pub async fn query_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM queries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AskdocError::Database(format!("failed to count queries: {e}")))?;

        row.try_get("n")
            .map_err(|e| AskdocError::Database(format!("failed to read query count: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_record_construction() {
        let record = UploadRecord::new(vec!["report.pdf".to_string()], Some(12), 45);
        assert_eq!(record.page_estimate, Some(12));
        assert_eq!(record.chunk_count, 45);
        assert_eq!(record.file_names.len(), 1);
    }

    #[test]
    fn test_query_record_construction() {
        let session = Uuid::new_v4();
        let record = QueryRecord::new(session, "q", "a");
        assert_eq!(record.session_id, session);
        assert_eq!(record.question, "q");
        assert_eq!(record.response, "a");
    }
}
