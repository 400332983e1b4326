// Shared fixtures for integration tests

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdf_qa::chunking::ChunkingConfig;
use pdf_qa::config::{Config, OllamaConfig, ServerConfig};
use serde_json::json;
use std::path::Path;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Build a minimal one-page PDF containing the given text
pub fn write_test_pdf(target: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("can encode content stream"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(target).expect("can save test PDF");
}

/// Config rooted at a temp dir, pointed at the mock Ollama server
pub fn test_config(base_dir: &Path, ollama_uri: &str) -> Config {
    let url = Url::parse(ollama_uri).expect("valid mock server uri");
    Config {
        ollama: OllamaConfig {
            host: url.host_str().expect("has host").to_string(),
            port: url.port().expect("has port"),
            ..OllamaConfig::default()
        },
        chunking: ChunkingConfig::default(),
        server: ServerConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

/// Mount embedding and generation mocks on the given server
///
/// Single-text embeddings carry a `prompt` field, batch embeddings an
/// `input` field; both shapes are answered with fixed vectors.
pub async fn mount_ollama_mocks(server: &MockServer, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("\"prompt\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.6, 0.8, 0.0]})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("\"input\""))
        .respond_with(BatchEmbedResponder)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"response": answer, "done": true})),
        )
        .mount(server)
        .await;
}

/// Answers batch embedding requests with one fixed-dimension vector per input
struct BatchEmbedResponder;

impl Respond for BatchEmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let count = body
            .get("input")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len);

        let embeddings: Vec<Vec<f64>> = (0..count)
            .map(|i| vec![0.6, 0.1 * (i as f64), 0.8])
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({"embeddings": embeddings}))
    }
}
