//! Application state management

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use askdoc_chat::{
    create_completion_client, ChatSession, LanguageNormalizer,
};
use askdoc_core::{AppConfig, CompletionClient, QueryLogStore, Result};
use askdoc_retrieval::{create_embedding_client, EmbeddingClient};
use tokio::sync::RwLock;
use uuid::Uuid;

/// The external capability clients one pipeline runs on
pub struct PipelineClients {
    pub embedder: Arc<dyn EmbeddingClient>,
    pub completion: Arc<dyn CompletionClient>,
    pub normalizer: Option<Arc<LanguageNormalizer>>,
}

impl PipelineClients {
    /// Build the configured provider clients
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::from(create_embedding_client(&config.llm)?);
        let completion: Arc<dyn CompletionClient> =
            Arc::from(create_completion_client(&config.llm)?);
        let normalizer =
            LanguageNormalizer::from_config(&config.translate, config.llm.timeout_secs)?
                .map(Arc::new);

        Ok(Self {
            embedder,
            completion,
            normalizer,
        })
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// External capability clients
    pub clients: PipelineClients,
    /// Optional query-history store
    pub history: Option<QueryLogStore>,
    /// Live sessions by id
    sessions: RwLock<HashMap<Uuid, Arc<ChatSession>>>,
    /// The session used when a request names none
    default_session: Uuid,
}

impl AppState {
    /// Create state with one default session
    pub fn new(config: AppConfig, clients: PipelineClients) -> Self {
        let default = Arc::new(ChatSession::new(
            clients.embedder.clone(),
            clients.completion.clone(),
            clients.normalizer.clone(),
            config.chat.clone(),
        ));
        let default_session = default.id();

        let mut sessions = HashMap::new();
        sessions.insert(default_session, default);

        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            clients,
            history: None,
            sessions: RwLock::new(sessions),
            default_session,
        }
    }

    /// Attach a query-history store
    pub fn with_history(mut self, store: QueryLogStore) -> Self {
        self.history = Some(store);
        self
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Look up a session; `None` means the default session.
    pub async fn session(&self, id: Option<Uuid>) -> Option<Arc<ChatSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(&id.unwrap_or(self.default_session)).cloned()
    }

    /// Create a fresh, independent session
    pub async fn create_session(&self) -> Arc<ChatSession> {
        let session = Arc::new(ChatSession::new(
            self.clients.embedder.clone(),
            self.clients.completion.clone(),
            self.clients.normalizer.clone(),
            self.config.chat.clone(),
        ));
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        session
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
