
use anyhow::{Context, Result};
use lopdf::Document;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source document with its text extracted page by page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    /// File name of the source document
    pub source: String,
    /// Extracted text, one entry per page in page order
    pub pages: Vec<String>,
}

/// Enumerate PDF files in a directory, sorted by file name
///
/// A missing directory yields an empty list rather than an error; the
/// caller decides how to surface an empty discovery.
#[inline]
pub fn discover_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("Document directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read document directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if path.is_file() && is_pdf {
            files.push(path);
        }
    }

    files.sort();
    debug!("Discovered {} PDF files in {}", files.len(), dir.display());
    Ok(files)
}

/// Extract per-page text from a single PDF file
///
/// Pages without extractable text are skipped; a document where no page
/// yields text is an error so the caller can skip the whole file.
#[inline]
pub fn extract_document(path: &Path) -> Result<ExtractedDocument> {
    let source = path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );

    let document = Document::load(path)
        .with_context(|| format!("Failed to load PDF file: {}", path.display()))?;

    let mut pages = Vec::new();
    for (page_number, _) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    debug!("Page {} of {} contains no text", page_number, source);
                } else {
                    pages.push(text);
                }
            }
            Err(e) => {
                warn!(
                    "Failed to extract text from page {} of {}: {}",
                    page_number, source, e
                );
            }
        }
    }

    if pages.is_empty() {
        return Err(
            crate::PdfQaError::Extraction(format!("No extractable text in {}", source)).into(),
        );
    }

    debug!("Extracted {} pages of text from {}", pages.len(), source);
    Ok(ExtractedDocument { source, pages })
}
