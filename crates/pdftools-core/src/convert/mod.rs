//! Conversion of uploads into PDF
//!
//! Dispatches on the declared content type, falling back to the file
//! extension when the client sent none or a generic binary type.

mod raster;
mod text;
mod word;

use crate::error::PdfToolError;
use image::ImageFormat;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

pub use self::text::layout_lines;

/// What an upload is, as far as conversion cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Jpeg,
    Png,
    Gif,
    PlainText,
    Word,
}

impl SourceKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "text/plain" => Some(Self::PlainText),
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Word)
            }
            _ => None,
        }
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "txt" | "text" => Some(Self::PlainText),
            "doc" | "docx" => Some(Self::Word),
            _ => None,
        }
    }

    /// Resolve the kind of an upload. A specific content type wins over the file name.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        let declared = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && !is_generic_binary(ct));

        match declared {
            Some(ct) => Self::from_content_type(ct),
            None => file_name.and_then(Self::from_file_name),
        }
    }
}

fn is_generic_binary(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .starts_with("application/octet-stream")
}

/// Convert an upload to PDF bytes
pub fn convert_to_pdf(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<Vec<u8>, PdfToolError> {
    let kind = SourceKind::detect(content_type, file_name).ok_or_else(|| {
        PdfToolError::UnsupportedFormat(
            content_type
                .or(file_name)
                .unwrap_or("unknown")
                .to_string(),
        )
    })?;

    tracing::debug!(?kind, size = bytes.len(), "converting upload");

    match kind {
        SourceKind::Pdf => Ok(bytes.to_vec()),
        SourceKind::Jpeg => raster::jpeg_to_pdf(bytes),
        SourceKind::Png => raster::raster_to_pdf(bytes, ImageFormat::Png),
        SourceKind::Gif => raster::raster_to_pdf(bytes, ImageFormat::Gif),
        SourceKind::PlainText => text::text_to_pdf(&String::from_utf8_lossy(bytes)),
        SourceKind::Word => text::text_to_pdf(&word::extract_text(bytes)?),
    }
}

/// A document with an empty page tree, ready for `append_page`
pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub(crate) fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    pub(crate) fn append_page(
        &mut self,
        width: f32,
        height: f32,
        resources: Dictionary,
        content: Vec<u8>,
    ) {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content));
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => resources,
            "Contents" => content_id,
        };
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
    }

    pub(crate) fn finish(mut self) -> Result<Vec<u8>, PdfToolError> {
        let count = self.page_ids.len() as i64;
        let kids: Vec<Object> = self.page_ids.into_iter().map(Object::Reference).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc.compress();
        crate::document::save_document(&mut self.doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_content_type_with_parameters() {
        assert_eq!(
            SourceKind::from_content_type("text/plain; charset=utf-8"),
            Some(SourceKind::PlainText)
        );
        assert_eq!(
            SourceKind::from_content_type("IMAGE/PNG"),
            Some(SourceKind::Png)
        );
    }

    #[test]
    fn test_octet_stream_falls_back_to_extension() {
        assert_eq!(
            SourceKind::detect(Some("application/octet-stream"), Some("scan.JPG")),
            Some(SourceKind::Jpeg)
        );
        assert_eq!(
            SourceKind::detect(None, Some("notes.docx")),
            Some(SourceKind::Word)
        );
    }

    #[test]
    fn test_specific_content_type_wins_over_extension() {
        assert_eq!(
            SourceKind::detect(Some("image/gif"), Some("photo.png")),
            Some(SourceKind::Gif)
        );
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let err = convert_to_pdf(b"whatever", Some("application/zip"), Some("a.zip")).unwrap_err();
        assert!(matches!(err, PdfToolError::UnsupportedFormat(_)));

        let err = convert_to_pdf(b"whatever", None, Some("README")).unwrap_err();
        assert!(matches!(err, PdfToolError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_pdf_passes_through_unchanged() {
        let pdf = crate::document::fixtures::labelled_pdf(1, "Keep");
        let out = convert_to_pdf(&pdf, Some("application/pdf"), None).unwrap();
        assert_eq!(out, pdf);
    }

    #[test]
    fn test_text_upload_becomes_pdf() {
        let out = convert_to_pdf(b"Hello, PDF", Some("text/plain"), Some("hello.txt")).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_builder_pages_keep_their_own_size() {
        let mut builder = PdfBuilder::new();
        builder.append_page(200.0, 100.0, Dictionary::new(), b"q Q".to_vec());
        builder.append_page(300.0, 400.0, Dictionary::new(), Vec::new());
        let out = builder.finish().unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let sizes: Vec<Vec<f32>> = pages
            .values()
            .map(|&id| {
                let page = doc.get_dictionary(id).unwrap();
                page.get(b"MediaBox")
                    .and_then(Object::as_array)
                    .unwrap()
                    .iter()
                    .map(|v| v.as_float().unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(sizes[0], vec![0.0, 0.0, 200.0, 100.0]);
        assert_eq!(sizes[1], vec![0.0, 0.0, 300.0, 400.0]);
    }
}
