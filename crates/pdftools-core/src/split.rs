//! PDF Split
//!
//! Keeps the selected pages of a document and drops the rest. Output pages
//! follow ascending source order, whatever order the user wrote them in.

use crate::document::{load_document, save_document};
use crate::error::PdfToolError;
use crate::page_range::{PageIndexSet, PageSpec};
use lopdf::Document;

/// Extract the selected pages into one document.
///
/// An empty selection produces a valid document with zero pages.
pub fn split_document(bytes: &[u8], selection: &PageIndexSet) -> Result<Vec<u8>, PdfToolError> {
    let doc = load_document(bytes)?;
    extract(&doc, selection)
}

/// Extract each selected page into its own single-page document, ascending
pub fn split_pages(bytes: &[u8], selection: &PageIndexSet) -> Result<Vec<Vec<u8>>, PdfToolError> {
    let doc = load_document(bytes)?;
    extract_each(&doc, selection)
}

/// Resolve `spec` against the document's own page count and extract those pages
pub fn split_by_spec(bytes: &[u8], spec: &PageSpec) -> Result<Vec<u8>, PdfToolError> {
    let doc = load_document(bytes)?;
    let selection = spec.resolve(doc.get_pages().len() as u32);
    extract(&doc, &selection)
}

/// Like [`split_by_spec`], one document per page, each paired with its 1-based page number
pub fn split_pages_by_spec(
    bytes: &[u8],
    spec: &PageSpec,
) -> Result<Vec<(u32, Vec<u8>)>, PdfToolError> {
    let doc = load_document(bytes)?;
    let selection = spec.resolve(doc.get_pages().len() as u32);
    let pages = extract_each(&doc, &selection)?;
    Ok(selection.page_numbers().into_iter().zip(pages).collect())
}

fn extract_each(doc: &Document, selection: &PageIndexSet) -> Result<Vec<Vec<u8>>, PdfToolError> {
    let page_count = doc.get_pages().len() as u32;

    selection
        .ascending()
        .map(|index| extract(doc, &PageIndexSet::from_indices([index], page_count)))
        .collect()
}

fn extract(source: &Document, selection: &PageIndexSet) -> Result<Vec<u8>, PdfToolError> {
    let page_count = source.get_pages().len() as u32;

    // lopdf numbers pages from 1; all deletions share one page snapshot
    let pages_to_delete: Vec<u32> = (0..page_count)
        .filter(|&index| !selection.contains(index))
        .map(|index| index + 1)
        .collect();

    let mut doc = source.clone();
    doc.delete_pages(&pages_to_delete);

    doc.prune_objects();
    doc.compress();

    tracing::debug!(
        kept = page_count as usize - pages_to_delete.len(),
        dropped = pages_to_delete.len(),
        "split document"
    );

    save_document(&mut doc)
}
