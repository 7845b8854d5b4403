//! PDF Compress
//!
//! Flate-compresses every stream and re-serializes with object streams and a
//! cross-reference stream. The output is reloaded before it is returned.

use crate::document::load_document;
use crate::error::PdfToolError;
use lopdf::Document;

pub fn compress_document(bytes: &[u8]) -> Result<Vec<u8>, PdfToolError> {
    let mut doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_modern(&mut buffer)
        .map_err(|e| PdfToolError::OperationError(format!("Save failed: {}", e)))?;

    verify_integrity(&buffer, page_count)?;

    tracing::debug!(
        before = bytes.len(),
        after = buffer.len(),
        pages = page_count,
        "compressed document"
    );

    Ok(buffer)
}

/// Check that `output` still loads and has `expected_pages` pages
pub fn verify_integrity(output: &[u8], expected_pages: usize) -> Result<(), PdfToolError> {
    let reloaded = Document::load_mem(output)
        .map_err(|e| PdfToolError::CompressionIntegrity(format!("reload failed: {}", e)))?;

    let pages = reloaded.get_pages().len();
    if pages != expected_pages {
        return Err(PdfToolError::CompressionIntegrity(format!(
            "page count changed from {} to {}",
            expected_pages, pages
        )));
    }

    Ok(())
}
