
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::ExtractedDocument;

/// A bounded-size span of document text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// The chunk text
    pub content: String,
    /// Name of the source document this chunk came from
    pub source: String,
    /// The index of this chunk within its document
    pub chunk_index: usize,
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Separator the document text is split on before packing
    pub separator: String,
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
    /// Number of trailing characters of one chunk repeated at the start of the next
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            max_chunk_size: 500,
            overlap: 0,
        }
    }
}

/// Split extracted documents into embedding-ready chunks
///
/// Output order matches source document order, then intra-document order.
/// Pure function: no side effects beyond logging.
#[inline]
pub fn split_documents(
    documents: &[ExtractedDocument],
    config: &ChunkingConfig,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();

    for document in documents {
        let text = document.pages.join("\n");
        let pieces = split_text(&text, config);

        for (chunk_index, content) in pieces.into_iter().enumerate() {
            chunks.push(DocumentChunk {
                content,
                source: document.source.clone(),
                chunk_index,
            });
        }
    }

    debug!(
        "Chunked {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );

    chunks
}

/// Split a single text into segments of at most `max_chunk_size` characters
///
/// Segments are produced by splitting on the configured separator and greedily
/// packing consecutive segments back together; a single segment longer than
/// the maximum is subdivided at character boundaries.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in text.split(config.separator.as_str()) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        for piece in subdivide(segment, config.max_chunk_size) {
            let piece_len = piece.chars().count();

            if current_len > 0 && current_len + 1 + piece_len > config.max_chunk_size {
                flush_chunk(&mut chunks, &mut current, &mut current_len, config);
            }

            if current_len == 0 {
                current = piece;
                current_len = piece_len;
            } else if current_len + 1 + piece_len <= config.max_chunk_size {
                current.push('\n');
                current.push_str(&piece);
                current_len += 1 + piece_len;
            } else {
                // Overlap seed would push the piece past the maximum; drop it
                current = piece;
                current_len = piece_len;
            }
        }
    }

    if current_len > 0 {
        chunks.push(current);
    }

    chunks
}

/// Flush the accumulated chunk and seed the next one with the overlap tail
fn flush_chunk(
    chunks: &mut Vec<String>,
    current: &mut String,
    current_len: &mut usize,
    config: &ChunkingConfig,
) {
    let flushed = std::mem::take(current);
    let tail = overlap_tail(&flushed, config.overlap);
    chunks.push(flushed);

    *current_len = tail.chars().count();
    *current = tail;
}

/// Subdivide a segment into pieces of at most `max` characters
fn subdivide(segment: &str, max: usize) -> Vec<String> {
    if segment.chars().count() <= max {
        return vec![segment.to_string()];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_len = 0;

    for ch in segment.chars() {
        if piece_len == max {
            pieces.push(std::mem::take(&mut piece));
            piece_len = 0;
        }
        piece.push(ch);
        piece_len += 1;
    }

    if piece_len > 0 {
        pieces.push(piece);
    }

    pieces
}

/// Extract the trailing `overlap` characters of a chunk
fn overlap_tail(content: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }

    let total = content.chars().count();
    if total <= overlap {
        return content.to_string();
    }

    content.chars().skip(total - overlap).collect()
}
