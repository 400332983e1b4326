// Vector index module
// Persists (chunk, embedding) pairs and serves nearest-neighbor search

pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::{SearchResult, VectorStore};

/// Embedding record stored in the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File name of the source document
    pub source: String,
    /// The actual text content of the chunk
    pub content: String,
    /// Index of this chunk within its document (for ordering)
    pub chunk_index: u32,
    /// Character count of the chunk
    pub char_count: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
