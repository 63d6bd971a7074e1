//! Askdoc API - HTTP server for the conversational QA service
//!
//! Exposes document ingestion, question answering, the SQL sub-flow, and
//! session management over axum, with CORS from config and a Swagger UI.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::documents::process_pdfs,
        handlers::documents::load_default_pdf,
        handlers::ask::ask_question,
        handlers::sql::sql_query,
        handlers::sessions::create_session,
        handlers::sessions::get_session,
        handlers::health::health,
    ),
    components(schemas(
        handlers::documents::ProcessResponse,
        handlers::ask::AskRequest,
        handlers::ask::AskResponse,
        handlers::sql::SqlCredentialsDto,
        handlers::sql::SqlQueryRequest,
        handlers::sql::SqlQueryResponse,
        handlers::sessions::SessionResponse,
        handlers::sessions::SessionInfo,
        handlers::health::HealthResponse,
        error::ApiError,
    )),
    tags(
        (name = "askdoc", description = "Conversational document question answering")
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    let max_body = state.config.server.max_body_size;

    Router::new()
        .merge(routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS from config: permissive when no origins are pinned, restricted to
/// the configured list otherwise.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
