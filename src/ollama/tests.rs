use super::*;
use crate::chunking::ChunkingConfig;
use crate::config::{OllamaConfig, ServerConfig};
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(uri: &str) -> Config {
    let url = Url::parse(uri).expect("valid mock server uri");
    Config {
        ollama: OllamaConfig {
            host: url.host_str().expect("has host").to_string(),
            port: url.port().expect("has port"),
            ..OllamaConfig::default()
        },
        chunking: ChunkingConfig::default(),
        server: ServerConfig::default(),
        base_dir: PathBuf::new(),
    }
}

fn client_for(uri: &str) -> OllamaClient {
    OllamaClient::new(&config_for(uri))
        .expect("can create client")
        .with_retry_attempts(1)
}

#[test]
fn client_configuration() {
    let mut config = config_for("http://test-host:1234");
    config.ollama.embedding_model = "embed-model".to_string();
    config.ollama.chat_model = "chat-model".to_string();
    config.ollama.batch_size = 128;

    let client = OllamaClient::new(&config).expect("can create client");

    assert_eq!(client.embedding_model, "embed-model");
    assert_eq!(client.chat_model, "chat-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = client_for("http://localhost:11434").with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_embedding_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.25, 0.5, 0.75]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
        .await
        .expect("task completes")
        .expect("embedding succeeds");

    assert_eq!(result.text, "hello");
    assert_eq!(result.embedding, vec![0.25, 0.5, 0.75]);
    assert_eq!(result.chunk_index, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_embedding_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let texts = vec!["first".to_string(), "second".to_string()];
    let results = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
        .await
        .expect("task completes")
        .expect("batch succeeds");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].embedding, vec![1.0, 0.0]);
    assert_eq!(results[1].text, "second");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let texts = vec!["first".to_string(), "second".to_string()];
    let result = tokio::task::spawn_blocking(move || client.generate_embeddings_batch(&texts))
        .await
        .expect("task completes");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chunk_embeddings_carry_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.5, 0.5]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let chunks = vec![DocumentChunk {
        content: "chunk text".to_string(),
        source: "a.pdf".to_string(),
        chunk_index: 3,
    }];
    let results = tokio::task::spawn_blocking(move || client.generate_chunk_embeddings(&chunks))
        .await
        .expect("task completes")
        .expect("embedding succeeds");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_index, Some(3));
    assert_eq!(results[0].source.as_deref(), Some("a.pdf"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generate_returns_answer_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "Paris is the capital.", "done": true})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let answer = tokio::task::spawn_blocking(move || client.generate("What is the capital?"))
        .await
        .expect("task completes")
        .expect("generation succeeds");

    assert_eq!(answer.as_deref(), Some("Paris is the capital."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generate_without_answer_field_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let answer = tokio::task::spawn_blocking(move || client.generate("anything"))
        .await
        .expect("task completes")
        .expect("generation succeeds");

    assert_eq!(answer, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri()).with_retry_attempts(3);
    let result = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
        .await
        .expect("task completes");

    assert!(result.is_err());
}
