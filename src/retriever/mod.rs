
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use crate::index::VectorStore;
use crate::ollama::OllamaClient;

/// Number of chunks retrieved per question; not exposed at the HTTP boundary
pub const DEFAULT_TOP_K: usize = 4;

/// Query capability bound to one vector index snapshot
///
/// Ingestion produces a fresh `Retriever` for every completed run; holders of
/// an old handle keep searching the snapshot it was bound to.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    client: Arc<OllamaClient>,
    top_k: usize,
}

/// A chunk returned from retrieval, ordered by descending relevance
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub similarity_score: f32,
}

impl Retriever {
    #[inline]
    pub fn new(store: Arc<VectorStore>, client: Arc<OllamaClient>) -> Self {
        Self {
            store,
            client,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Retrieve the most relevant chunks for a query text
    #[inline]
    pub async fn retrieve(&self, query_text: &str) -> Result<Vec<RetrievedChunk>> {
        let query_embedding = self
            .client
            .generate_embedding(query_text)
            .context("Failed to embed query text")?;

        let results = self
            .store
            .search_similar(&query_embedding.embedding, self.top_k)
            .await
            .context("Vector search failed")?;

        debug!(
            "Retrieved {} chunks for query (length: {})",
            results.len(),
            query_text.len()
        );

        Ok(results
            .into_iter()
            .map(|result| RetrievedChunk {
                content: result.metadata.content,
                source: result.metadata.source,
                similarity_score: result.similarity_score,
            })
            .collect())
    }
}
