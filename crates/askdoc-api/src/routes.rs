//! API route definitions

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{ask, documents, health, sessions, sql};
use crate::state::AppState;

/// Application routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process_pdfs", post(documents::process_pdfs))
        .route("/load_default_pdf", get(documents::load_default_pdf))
        .route("/ask_question", post(ask::ask_question))
        .route("/sql-query", post(sql::sql_query))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/health", get(health::health))
}
