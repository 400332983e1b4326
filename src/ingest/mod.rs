
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::split_documents;
use crate::config::Config;
use crate::extract::{discover_pdf_files, extract_document};
use crate::index::{ChunkMetadata, EmbeddingRecord, VectorStore};
use crate::ollama::OllamaClient;
use crate::retriever::Retriever;

/// Counts describing a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    /// Documents successfully extracted
    pub documents: usize,
    /// File names skipped because extraction failed
    pub skipped: Vec<String>,
    /// Chunks embedded and indexed
    pub chunks: usize,
}

/// Total outcome of an ingestion run
///
/// Every failure inside the pipeline is converted into a variant here;
/// nothing escapes the pipeline boundary as an error or panic.
pub enum IngestOutcome {
    /// The index was rebuilt and a retriever is bound to it
    Ready {
        retriever: Retriever,
        report: IngestionReport,
    },
    /// Nothing to index; the message says why
    Empty(String),
    /// A provider or index failure aborted the run
    Failed(String),
}

/// Rebuilds the vector index from the documents folder
///
/// Runs Discover, Extract, Chunk, Embed&Index, and Persist in order, exiting
/// early with an `Empty` outcome when a stage produces nothing. Re-ingestion
/// is always a full rebuild of the index.
pub struct IngestionPipeline {
    config: Config,
    client: Arc<OllamaClient>,
}

impl IngestionPipeline {
    #[inline]
    pub fn new(config: Config, client: Arc<OllamaClient>) -> Self {
        Self { config, client }
    }

    #[inline]
    pub async fn ingest(&self) -> IngestOutcome {
        let documents_dir = self.config.documents_path();
        info!("Searching for PDF files in: {}", documents_dir.display());

        // Discover
        let files = match discover_pdf_files(&documents_dir) {
            Ok(files) => files,
            Err(e) => {
                error!("Failed to scan document folder: {:#}", e);
                return IngestOutcome::Failed(format!("Error scanning the document folder: {}", e));
            }
        };

        if files.is_empty() {
            info!("No PDF files found in {}", documents_dir.display());
            return IngestOutcome::Empty(format!(
                "No PDF files were found in the {} folder.",
                documents_dir.display()
            ));
        }

        // Extract, skipping files whose extraction fails
        let mut documents = Vec::new();
        let mut skipped = Vec::new();
        for file in &files {
            match extract_document(file) {
                Ok(document) => {
                    info!(
                        "Extracted {} pages from {}",
                        document.pages.len(),
                        document.source
                    );
                    documents.push(document);
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", file.display(), e);
                    skipped.push(file.file_name().map_or_else(
                        || file.display().to_string(),
                        |name| name.to_string_lossy().into_owned(),
                    ));
                }
            }
        }

        if documents.is_empty() {
            warn!("No documents could be loaded from the PDF files");
            return IngestOutcome::Empty(
                "Documents could not be loaded from the PDF files.".to_string(),
            );
        }

        // Chunk
        let chunks = split_documents(&documents, &self.config.chunking);
        if chunks.is_empty() {
            warn!("Splitting produced no chunks");
            return IngestOutcome::Empty(
                "The documents could not be split into chunks.".to_string(),
            );
        }

        // Embed
        let embeddings = match self.client.generate_chunk_embeddings(&chunks) {
            Ok(embeddings) => embeddings,
            Err(e) => {
                error!("Embedding generation failed: {:#}", e);
                return IngestOutcome::Failed(format!("Error creating the vector index: {}", e));
            }
        };

        // All vectors in one index must share a dimension
        let dimension = embeddings.first().map_or(0, |e| e.embedding.len());
        if dimension == 0
            || embeddings
                .iter()
                .any(|e| e.embedding.len() != dimension)
        {
            error!("Embedding dimension mismatch across chunks");
            return IngestOutcome::Failed(
                "Error creating the vector index: embedding dimension mismatch.".to_string(),
            );
        }

        let created_at = Utc::now().to_rfc3339();
        let records: Vec<EmbeddingRecord> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| EmbeddingRecord {
                id: Uuid::new_v4().to_string(),
                vector: embedding.embedding.clone(),
                metadata: ChunkMetadata {
                    source: chunk.source.clone(),
                    content: chunk.content.clone(),
                    chunk_index: chunk.chunk_index as u32,
                    char_count: chunk.content.chars().count() as u32,
                    created_at: created_at.clone(),
                },
            })
            .collect();

        // Index & persist (full rebuild)
        let chunk_count = records.len();
        let store = match VectorStore::rebuild(&self.config, records).await {
            Ok(store) => store,
            Err(e) => {
                error!("Index creation failed: {}", e);
                return IngestOutcome::Failed(format!("Error creating the vector index: {}", e));
            }
        };

        info!(
            "Indexed {} chunks from {} documents ({} skipped)",
            chunk_count,
            documents.len(),
            skipped.len()
        );

        IngestOutcome::Ready {
            retriever: Retriever::new(Arc::new(store), Arc::clone(&self.client)),
            report: IngestionReport {
                documents: documents.len(),
                skipped,
                chunks: chunk_count,
            },
        }
    }
}
