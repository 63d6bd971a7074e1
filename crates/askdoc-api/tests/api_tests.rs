//! API integration tests
//!
//! Run the real router against deterministic capability doubles, so the
//! full ingest-and-ask pipeline is exercised without network access.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use askdoc_api::state::{AppState, PipelineClients};
use askdoc_api::create_router;
use askdoc_chat::testing::{MockCompletion, MockEmbedding};
use askdoc_core::AppConfig;
use askdoc_retrieval::{ChunkConfig, Chunker, EmbeddingClient, VectorIndex};

fn test_state() -> Arc<AppState> {
    let clients = PipelineClients {
        embedder: Arc::new(MockEmbedding::new(64)),
        completion: Arc::new(MockCompletion::new()),
        normalizer: None,
    };
    Arc::new(AppState::new(AppConfig::default(), clients))
}

/// Publish an index over `text` to the state's default session, bypassing
/// PDF extraction (multipart uploads are covered separately).
async fn ingest_text(state: &Arc<AppState>, text: &str) {
    let chunker = Chunker::new(ChunkConfig::default()).unwrap();
    let chunks = chunker.chunk_text(text);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = MockEmbedding::new(64).embed_batch(&texts).await.unwrap();
    let index = VectorIndex::build(chunks, vectors).unwrap();

    let session = state.session(None).await.unwrap();
    session.install_index(index, false).await;
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// =============================================================================
// Ask question
// =============================================================================

#[tokio::test]
async fn test_ask_before_ingest_is_400() {
    let app = create_router(test_state());

    let response = app
        .oneshot(json_request(
            "POST",
            "/ask_question",
            json!({"question": "What is the capital of France?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["code"], "INDEX_NOT_READY");
}

#[tokio::test]
async fn test_empty_question_is_400() {
    let app = create_router(test_state());

    let response = app
        .oneshot(json_request(
            "POST",
            "/ask_question",
            json!({"question": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_ingest_then_ask_round_trip() {
    let state = test_state();
    ingest_text(&state, "The capital of France is Paris.").await;

    let app = create_router(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/ask_question",
            json!({"question": "What is the capital of France?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    let answer = json["response"].as_str().unwrap();
    assert!(answer.contains("Paris"));
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let state = test_state();
    ingest_text(&state, "The capital of France is Paris.").await;

    let app = create_router(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/ask_question",
            json!({
                "question": "What is the capital of France?",
                "session_id": "00000000-0000-0000-0000-000000000001"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_create_and_inspect_session() {
    let app = create_router(test_state());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    let session_id = json["session_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["state"], "uninitialized");
    assert_eq!(json["turns"], 0);
    assert!(json["chunk_count"].is_null());
}

// =============================================================================
// Ingestion
// =============================================================================

fn multipart_request(uri: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let boundary = "askdoc-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_unreadable_pdf_is_400() {
    let app = create_router(test_state());

    let response = app
        .oneshot(multipart_request(
            "/process_pdfs",
            "broken.pdf",
            b"this is not a pdf",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_without_files_is_400() {
    let boundary = "askdoc-test-boundary";
    let body = format!("--{boundary}--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri("/process_pdfs")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let app = create_router(test_state());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
