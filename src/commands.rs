use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::config::{Config, default_base_dir};
use crate::extract::discover_pdf_files;
use crate::index::VectorStore;
use crate::ingest::{IngestOutcome, IngestionPipeline};
use crate::ollama::OllamaClient;
use crate::server;

fn resolve_config(base_dir: Option<PathBuf>) -> Result<Config> {
    let base_dir = match base_dir {
        Some(dir) => dir,
        None => default_base_dir().context("Failed to determine base directory")?,
    };
    Config::load(base_dir)
}

/// Start the HTTP server, ingesting any pre-existing PDFs first
#[inline]
pub async fn serve(base_dir: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut config = resolve_config(base_dir)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let client =
        Arc::new(OllamaClient::new(&config).context("Failed to initialize Ollama client")?);

    if let Err(e) = client.health_check() {
        warn!(
            "Ollama health check failed: {:#}. Ingestion and answering will fail until the server is reachable.",
            e
        );
    }

    server::serve(config, client).await
}

/// Run a one-shot ingestion over the documents folder
#[inline]
pub async fn ingest_folder(base_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(base_dir)?;
    let client =
        Arc::new(OllamaClient::new(&config).context("Failed to initialize Ollama client")?);
    let pipeline = IngestionPipeline::new(config.clone(), client);

    match pipeline.ingest().await {
        IngestOutcome::Ready { report, .. } => {
            println!("Ingestion complete.");
            println!("  Documents indexed: {}", report.documents);
            println!("  Chunks embedded: {}", report.chunks);
            if !report.skipped.is_empty() {
                println!("  Skipped files: {}", report.skipped.join(", "));
            }
        }
        IngestOutcome::Empty(message) | IngestOutcome::Failed(message) => {
            println!("{}", message);
        }
    }

    Ok(())
}

/// Show the document folder and index state
#[inline]
pub async fn show_status(base_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(base_dir)?;

    let documents_dir = config.documents_path();
    let files = discover_pdf_files(&documents_dir)?;

    println!("Document folder: {}", documents_dir.display());
    if files.is_empty() {
        println!("  No PDF files found.");
        println!("  Use 'pdf-qa serve' and POST /data to upload documents.");
    } else {
        println!("  PDF files: {}", files.len());
        for file in &files {
            if let Some(name) = file.file_name() {
                println!("    {}", name.to_string_lossy());
            }
        }
    }

    if config.vector_database_path().is_dir() {
        let store = VectorStore::open(&config)
            .await
            .context("Failed to open vector store")?;
        let count = store
            .count_embeddings()
            .await
            .context("Failed to count embeddings")?;
        println!("Vector index: {} embeddings", count);
    } else {
        println!("Vector index: not built yet");
    }

    Ok(())
}

/// Print the active configuration
#[inline]
pub fn show_config(base_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(base_dir)?;
    let rendered =
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

    println!("Configuration ({}):", config.config_file_path().display());
    println!("{}", rendered);

    Ok(())
}
