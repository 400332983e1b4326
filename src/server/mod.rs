
use anyhow::{Context, Result};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::ingest::{IngestOutcome, IngestionPipeline};
use crate::ollama::OllamaClient;
use crate::qa::{AnswerError, QaEngine};

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>PDF Q&amp;A</title></head>
<body>
<h1>PDF Q&amp;A</h1>
<p>Upload PDF documents to <code>POST /data</code> (multipart field <code>pdfs</code>),
then ask questions via <code>POST /ask</code> with a JSON body
<code>{"question": "..."}</code>.</p>
</body>
</html>
"#;

/// Shared state for all request handlers
#[derive(Clone)]
pub struct AppState {
    engine: Arc<QaEngine>,
    pipeline: Arc<IngestionPipeline>,
    config: Arc<Config>,
    // Serializes ingestion runs against the shared index path
    ingest_lock: Arc<Mutex<()>>,
}

impl AppState {
    #[inline]
    pub fn new(config: Config, client: Arc<OllamaClient>) -> Self {
        let engine = Arc::new(QaEngine::new(Arc::clone(&client)));
        let pipeline = Arc::new(IngestionPipeline::new(config.clone(), client));

        Self {
            engine,
            pipeline,
            config: Arc::new(config),
            ingest_lock: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn engine(&self) -> &Arc<QaEngine> {
        &self.engine
    }

    /// Run the ingestion pipeline and rebind the retriever on success
    ///
    /// The ingest lock is held for the whole run so concurrent uploads never
    /// rebuild the same index path at the same time.
    #[inline]
    pub async fn run_ingestion(&self) -> IngestOutcome {
        let _guard = self.ingest_lock.lock().await;
        let outcome = self.pipeline.ingest().await;

        if let IngestOutcome::Ready { retriever, report } = outcome {
            self.engine.bind_retriever(retriever.clone()).await;
            IngestOutcome::Ready { retriever, report }
        } else {
            outcome
        }
    }
}

/// Build the application router
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Html(LANDING_PAGE) }))
        .route("/data", post(upload_pdfs))
        .route("/ask", post(ask_question))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server and run until shutdown
#[inline]
pub async fn serve(config: Config, client: Arc<OllamaClient>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState::new(config, client);

    // Process any pre-existing PDFs before accepting requests
    match state.run_ingestion().await {
        IngestOutcome::Ready { ref report, .. } => {
            info!(
                "Startup ingestion complete: {} documents, {} chunks",
                report.documents, report.chunks
            );
        }
        IngestOutcome::Empty(ref message) => info!("Startup ingestion: {}", message),
        IngestOutcome::Failed(ref message) => warn!("Startup ingestion failed: {}", message),
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn upload_pdfs(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let documents_dir = state.config.documents_path();
    let mut saw_file_part = false;
    let mut saved = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart payload: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "No file part");
            }
        };

        if field.name() != Some("pdfs") {
            continue;
        }
        saw_file_part = true;

        let Some(file_name) = field.file_name().map(sanitize_file_name) else {
            continue;
        };
        let is_pdf = std::path::Path::new(&file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read uploaded file {}: {}", file_name, e);
                return error_response(StatusCode::BAD_REQUEST, "No file part");
            }
        };

        if let Err(e) = std::fs::create_dir_all(&documents_dir) {
            error!("Failed to create document directory: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded files",
            );
        }

        // Duplicate file names overwrite the previous upload; the full
        // rebuild below makes the index reflect the new content
        let target = documents_dir.join(&file_name);
        if let Err(e) = std::fs::write(&target, &bytes) {
            error!("Failed to save uploaded file {}: {}", target.display(), e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded files",
            );
        }

        info!("Saved uploaded file {} ({} bytes)", file_name, bytes.len());
        saved += 1;
    }

    if !saw_file_part {
        return error_response(StatusCode::BAD_REQUEST, "No file part");
    }

    info!("Upload received {} PDF files; re-ingesting", saved);

    match state.run_ingestion().await {
        IngestOutcome::Ready { report, .. } => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "documents": report.documents,
                "chunks": report.chunks,
            })),
        )
            .into_response(),
        IngestOutcome::Empty(message) => (
            StatusCode::OK,
            Json(json!({"status": "empty", "message": message})),
        )
            .into_response(),
        IngestOutcome::Failed(message) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
    }
}

async fn ask_question(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let Some(question) = payload.get("question").and_then(Value::as_str) else {
        warn!("Request payload is missing the question field");
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request payload. 'question' field is missing.",
        );
    };

    match state.engine.answer(question).await {
        Ok(answer) => (StatusCode::OK, Json(json!({"answer": answer}))).into_response(),
        Err(e @ (AnswerError::NoDocuments | AnswerError::InvalidRequest)) => {
            warn!("Rejected question: {}", e);
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            error!("Failed to answer question: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// Strip any path components from an uploaded file name
fn sanitize_file_name(name: &str) -> String {
    std::path::Path::new(name).file_name().map_or_else(
        || "upload.pdf".to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}
