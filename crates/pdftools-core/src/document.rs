//! Loading and saving documents through lopdf

use crate::error::PdfToolError;
use lopdf::Document;

/// Load a PDF the façade can operate on.
///
/// Encrypted documents are rejected: lopdf can only read them with the right
/// password, and re-saving a partially decrypted file produces garbage.
pub fn load_document(bytes: &[u8]) -> Result<Document, PdfToolError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| PdfToolError::CorruptOrEncryptedInput(e.to_string()))?;

    if doc.is_encrypted() {
        return Err(PdfToolError::CorruptOrEncryptedInput(
            "document is encrypted".into(),
        ));
    }

    Ok(doc)
}

/// Serialize with a classic cross-reference table
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, PdfToolError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfToolError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfToolError> {
    let doc = load_document(bytes)?;
    Ok(doc.get_pages().len() as u32)
}


#[cfg(test)]
mod tests {
    use super::fixtures::labelled_pdf;
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(get_page_count(&labelled_pdf(4, "Count")).unwrap(), 4);
    }

    #[test]
    fn test_garbage_is_corrupt_input() {
        let err = load_document(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfToolError::CorruptOrEncryptedInput(_)));
    }

    #[test]
    fn test_truncated_pdf_is_corrupt_input() {
        let pdf = labelled_pdf(2, "Cut");
        assert!(load_document(&pdf[..pdf.len() / 3]).is_err());
    }
}
