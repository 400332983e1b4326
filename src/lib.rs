use thiserror::Error;

pub type Result<T> = std::result::Result<T, PdfQaError>;

#[derive(Error, Debug)]
pub enum PdfQaError {
    #[error("Index error: {0}")]
    Index(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod memory;
pub mod ollama;
pub mod qa;
pub mod retriever;
pub mod server;
