//! PDF Protect
//!
//! Encrypts a document with the standard security handler (V4, AES-128).
//! The supplied password is used as both the user and the owner password.

use crate::document::{load_document, save_document};
use crate::error::PdfToolError;
use lopdf::encryption::crypt_filters::{Aes128CryptFilter, CryptFilter};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

const CRYPT_FILTER_NAME: &[u8] = b"StdCF";

pub fn protect_document(bytes: &[u8], password: &str) -> Result<Vec<u8>, PdfToolError> {
    if password.is_empty() {
        return Err(PdfToolError::InvalidPassword(
            "password must not be empty".into(),
        ));
    }

    let mut doc = load_document(bytes)?;
    ensure_file_id(&mut doc, bytes);

    let state = encryption_state(&doc, password)?;
    doc.encrypt(&state)
        .map_err(|e| PdfToolError::OperationError(format!("Encryption failed: {}", e)))?;

    save_document(&mut doc)
}

/// AES-128 standard security handler state for `doc`, which must already carry a file ID
fn encryption_state(doc: &Document, password: &str) -> Result<EncryptionState, PdfToolError> {
    let crypt_filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
    let version = EncryptionVersion::V4 {
        document: doc,
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(CRYPT_FILTER_NAME.to_vec(), crypt_filter)]),
        stream_filter: CRYPT_FILTER_NAME.to_vec(),
        string_filter: CRYPT_FILTER_NAME.to_vec(),
        owner_password: password,
        user_password: password,
        permissions: Permissions::all(),
    };

    // lopdf rejects passwords it cannot encode for the handler
    EncryptionState::try_from(version).map_err(|e| PdfToolError::InvalidPassword(e.to_string()))
}

/// The key derivation hashes the first file identifier, so one must exist
fn ensure_file_id(doc: &mut Document, source: &[u8]) {
    if doc.trailer.has(b"ID") {
        return;
    }

    let digest = Sha256::digest(source);
    let id = digest[..16].to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::{labelled_pdf, page_labels};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_protected_output_is_encrypted() {
        let out = protect_document(&labelled_pdf(2, "Secret"), "hunter2").unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert!(doc.is_encrypted());
        assert!(!String::from_utf8_lossy(&out).contains("Secret-Page-1"));
    }

    /// Encrypt in memory the same way `protect_document` does
    fn encrypted_in_memory(pdf: &[u8], password: &str) -> Document {
        let mut doc = Document::load_mem(pdf).unwrap();
        ensure_file_id(&mut doc, pdf);
        let state = encryption_state(&doc, password).unwrap();
        doc.encrypt(&state).unwrap();
        doc
    }

    #[test]
    fn test_encrypt_dictionary_is_aes_128() {
        let doc = encrypted_in_memory(&labelled_pdf(1, "Secret"), "hunter2");
        let encrypt = doc.get_encrypted().unwrap();

        assert_eq!(encrypt.get(b"Filter").unwrap().as_name().unwrap(), b"Standard");
        assert_eq!(encrypt.get(b"V").unwrap().as_i64().unwrap(), 4);
        assert_eq!(encrypt.get(b"R").unwrap().as_i64().unwrap(), 4);
        assert_eq!(encrypt.get(b"StmF").unwrap().as_name().unwrap(), CRYPT_FILTER_NAME);
        assert_eq!(encrypt.get(b"StrF").unwrap().as_name().unwrap(), CRYPT_FILTER_NAME);

        let std_cf = encrypt
            .get(b"CF")
            .and_then(Object::as_dict)
            .and_then(|filters| filters.get(CRYPT_FILTER_NAME))
            .and_then(Object::as_dict)
            .unwrap();
        assert_eq!(std_cf.get(b"CFM").unwrap().as_name().unwrap(), b"AESV2");
    }

    #[test]
    fn test_password_decrypts_back_to_original_pages() {
        let mut doc = encrypted_in_memory(&labelled_pdf(2, "Secret"), "hunter2");
        assert!(doc.is_encrypted());
        assert!(doc.authenticate_password("wrong").is_err());

        doc.decrypt("hunter2").unwrap();
        assert!(!doc.is_encrypted());

        let mut plain = Vec::new();
        doc.save_to(&mut plain).unwrap();
        assert_eq!(page_labels(&plain), vec!["Secret-Page-1", "Secret-Page-2"]);
    }

    #[test]
    fn test_empty_password_rejected() {
        let err = protect_document(&labelled_pdf(1, "X"), "").unwrap_err();
        assert!(matches!(err, PdfToolError::InvalidPassword(_)));
    }

    #[test]
    fn test_already_encrypted_input_rejected() {
        let once = protect_document(&labelled_pdf(1, "X"), "pw").unwrap();
        let err = protect_document(&once, "pw").unwrap_err();
        assert!(matches!(err, PdfToolError::CorruptOrEncryptedInput(_)));
    }

    #[test]
    fn test_file_id_added_when_missing() {
        let pdf = labelled_pdf(1, "X");
        let mut doc = Document::load_mem(&pdf).unwrap();
        assert!(!doc.trailer.has(b"ID"));

        ensure_file_id(&mut doc, &pdf);

        let id = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(id.len(), 2);
        assert_eq!(id[0].as_str().unwrap().len(), 16);
    }
}
