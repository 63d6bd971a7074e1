//! Askdoc API server

use std::sync::Arc;

use askdoc_api::state::{AppState, PipelineClients};
use askdoc_api::{create_router, handlers};
use askdoc_core::{AppConfig, QueryLogStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config);

    let clients = PipelineClients::from_config(&config)?;
    let mut state = AppState::new(config, clients);

    if let Some(url) = state.config.database.postgres_url.clone() {
        match QueryLogStore::new(&url, state.config.database.pool_size).await {
            Ok(store) => {
                if let Err(e) = store.init_schema().await {
                    tracing::warn!(error = %e, "failed to initialize history schema");
                }
                state = state.with_history(store);
                tracing::info!("query-history store connected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "history database unreachable, continuing without it");
            }
        }
    }

    let state = Arc::new(state);

    bootstrap_default_document(&state).await;

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("askdoc API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("ASKDOC_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "askdoc_api={level},askdoc_chat={level},tower_http=info",
            level = config.logging.level
        ))
    });

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Ingest the bundled default document on startup, matching the behavior of
/// the upload endpoint. Best-effort: a missing file or a down capability
/// leaves the default session uninitialized rather than aborting startup.
async fn bootstrap_default_document(state: &Arc<AppState>) {
    let path = state.config.chat.default_document.clone();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::info!(path = %path, error = %e, "no default document to ingest at startup");
            return;
        }
    };

    let Some(session) = state.session(None).await else {
        return;
    };

    match handlers::documents::ingest_blobs(state, &session, &[bytes], vec![path.clone()], false)
        .await
    {
        Ok(outcome) => {
            tracing::info!(path = %path, chunks = outcome.chunk_count, "default document ingested");
        }
        Err(e) => {
            tracing::warn!(path = %path, error = ?e, "startup ingestion of default document failed");
        }
    }
}
