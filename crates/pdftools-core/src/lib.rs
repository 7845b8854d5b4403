//! PDF tools over lopdf
//!
//! Byte-in, byte-out operations behind the upload endpoints:
//! - `convert_to_pdf`: PDFs, images, plain text and Word text to PDF
//! - `split_document` / `split_pages`: keep selected pages (`*_by_spec` take
//!   the raw page spec and resolve it against the loaded document)
//! - `merge_documents`: concatenate documents in order
//! - `compress_document`: deflate streams and pack objects
//! - `protect_document`: password encryption
//!
//! Page selections come from [`page_range`], which never fails: malformed
//! input just selects fewer pages.

pub mod compress;
pub mod convert;
pub mod document;
pub mod error;
pub mod merge;
pub mod page_range;
pub mod protect;
pub mod split;

pub use compress::compress_document;
pub use convert::{convert_to_pdf, SourceKind};
pub use document::get_page_count;
pub use error::PdfToolError;
pub use merge::merge_documents;
pub use page_range::{parse_page_spec, PageIndexSet, PageSpec, PageToken};
pub use protect::protect_document;
pub use split::{split_by_spec, split_document, split_pages, split_pages_by_spec};
