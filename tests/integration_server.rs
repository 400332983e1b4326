#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests driving the HTTP surface: upload PDFs, re-ingest,
// and answer questions with conversation memory threading

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{mount_ollama_mocks, test_config, write_test_pdf};
use pdf_qa::ollama::OllamaClient;
use pdf_qa::server::{AppState, router};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

const BOUNDARY: &str = "test-boundary";

fn multipart_pdf_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdfs\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_upload(state: &AppState, file_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/data")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_pdf_body(file_name, bytes)))
                .expect("can build request"),
        )
        .await
        .expect("request succeeds");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("can read body");
    (status, serde_json::from_slice(&bytes).expect("body is JSON"))
}

async fn post_ask(state: &AppState, question: &str) -> (StatusCode, Value) {
    let payload = serde_json::json!({"question": question});
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("can build request"),
        )
        .await
        .expect("request succeeds");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("can read body");
    (status, serde_json::from_slice(&bytes).expect("body is JSON"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_then_ask_end_to_end() {
    let server = MockServer::start().await;
    mount_ollama_mocks(&server, "The capital of France is Paris.").await;

    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = test_config(temp_dir.path(), &server.uri());
    let client = Arc::new(OllamaClient::new(&config).expect("can create client"));
    let state = AppState::new(config, client);

    let pdf_path = temp_dir.path().join("a.pdf");
    write_test_pdf(&pdf_path, "Paris is the capital of France.");
    let pdf_bytes = std::fs::read(&pdf_path).expect("can read test PDF");

    let (status, body) = post_upload(&state, "a.pdf", &pdf_bytes).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["documents"], 1);
    assert!(body["chunks"].as_u64().expect("chunks is a number") >= 1);

    let (status, body) = post_ask(&state, "What is the capital of France?").await;
    assert_eq!(status, StatusCode::OK);
    let answer = body["answer"].as_str().expect("answer is a string");
    assert!(answer.contains("Paris"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_questions_thread_conversation_memory() {
    let server = MockServer::start().await;
    mount_ollama_mocks(&server, "A fine answer.").await;

    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = test_config(temp_dir.path(), &server.uri());
    let client = Arc::new(OllamaClient::new(&config).expect("can create client"));
    let state = AppState::new(config, client);

    let pdf_path = temp_dir.path().join("notes.pdf");
    write_test_pdf(&pdf_path, "X is a thing. Y is another thing.");
    let pdf_bytes = std::fs::read(&pdf_path).expect("can read test PDF");
    let (status, _) = post_upload(&state, "notes.pdf", &pdf_bytes).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(state.engine().memory().len(), 0);

    let (status, _) = post_ask(&state, "What is X?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.engine().memory().len(), 1);

    let (status, _) = post_ask(&state, "What about Y?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.engine().memory().len(), 2);

    let context = state.engine().memory().as_context();
    assert_eq!(context[0].question, "What is X?");
    assert_eq!(context[1].question, "What about Y?");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_upload_overwrites_and_rebuilds() {
    let server = MockServer::start().await;
    mount_ollama_mocks(&server, "An answer.").await;

    let temp_dir = TempDir::new().expect("can create temp dir");
    let config = test_config(temp_dir.path(), &server.uri());
    let documents_dir = config.documents_path();
    let client = Arc::new(OllamaClient::new(&config).expect("can create client"));
    let state = AppState::new(config, client);

    let first_path = temp_dir.path().join("v1.pdf");
    write_test_pdf(&first_path, "Original revision of the report.");
    let first_bytes = std::fs::read(&first_path).expect("can read test PDF");
    let (status, _) = post_upload(&state, "report.pdf", &first_bytes).await;
    assert_eq!(status, StatusCode::OK);

    let second_path = temp_dir.path().join("v2.pdf");
    write_test_pdf(&second_path, "Updated revision of the report.");
    let second_bytes = std::fs::read(&second_path).expect("can read test PDF");
    let (status, body) = post_upload(&state, "report.pdf", &second_bytes).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    // Same file name is overwritten rather than duplicated
    assert_eq!(body["documents"], 1);

    let saved = std::fs::read(documents_dir.join("report.pdf")).expect("can read saved PDF");
    assert_eq!(saved, second_bytes);
}
