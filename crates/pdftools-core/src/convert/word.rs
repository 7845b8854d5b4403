//! Text extraction from Word uploads
//!
//! `.docx` is a zip container; its body text lives in `word/document.xml`.
//! Legacy `.doc` files are read as lossy text with control bytes removed.

use crate::error::PdfToolError;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const DOCUMENT_PART: &str = "word/document.xml";

lazy_static! {
    /// A paragraph, either empty (`<w:p/>`) or with a body. The empty form is
    /// tried first at each position, so the body form never starts at `<w:p/>`.
    static ref PARAGRAPH: Regex =
        Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>").unwrap();

    /// Text runs, tabs and manual line breaks inside a paragraph
    static ref RUN_PIECE: Regex =
        Regex::new(r"(?s)<w:t\b[^>]*>(.*?)</w:t>|<w:tab\b[^>]*/>|<w:br\b[^>]*/>").unwrap();
}

pub(super) fn extract_text(bytes: &[u8]) -> Result<String, PdfToolError> {
    if bytes.starts_with(ZIP_MAGIC) {
        docx_text(bytes)
    } else {
        Ok(legacy_doc_text(bytes))
    }
}

fn docx_text(bytes: &[u8]) -> Result<String, PdfToolError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PdfToolError::UnsupportedFormat(format!("unreadable docx: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| PdfToolError::UnsupportedFormat(format!("{}: {}", DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PdfToolError::UnsupportedFormat(format!("{}: {}", DOCUMENT_PART, e)))?;

    Ok(document_xml_text(&xml))
}

/// One output line per paragraph
fn document_xml_text(xml: &str) -> String {
    let paragraphs: Vec<String> = PARAGRAPH
        .captures_iter(xml)
        .map(|paragraph| match paragraph.get(1) {
            Some(body) => paragraph_text(body.as_str()),
            None => String::new(),
        })
        .collect();
    paragraphs.join("\n")
}

fn paragraph_text(body: &str) -> String {
    let mut text = String::new();
    for piece in RUN_PIECE.captures_iter(body) {
        match piece.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None if piece[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push('\n'),
        }
    }
    text
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn legacy_doc_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .replace("\r\n", "\n")
        .chars()
        .filter_map(|c| match c {
            '\r' => Some('\n'),
            '\n' | '\t' => Some(c),
            '\u{FFFD}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx(document_xml: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(document_xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Lease</w:t></w:r><w:r><w:t xml:space="preserve"> Agreement</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Rent:</w:t></w:r><w:r><w:tab/><w:t>$1,000 &amp; utilities</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let text = extract_text(&docx(BODY)).unwrap();
        assert_eq!(text, "Lease Agreement\n\nRent:\t$1,000 & utilities");
    }

    #[test]
    fn test_docx_without_document_part_is_unsupported() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<x/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            extract_text(&bytes),
            Err(PdfToolError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_legacy_doc_strips_control_bytes() {
        let bytes = b"\xD0\xCF\x11\xE0Hello\x00\x01 world\nbye";
        assert_eq!(extract_text(bytes).unwrap(), "Hello world\nbye");
    }

    #[test]
    fn test_legacy_doc_line_endings() {
        assert_eq!(
            extract_text(b"one\r\ntwo\rthree\n\r\nfour").unwrap(),
            "one\ntwo\nthree\n\nfour"
        );
    }

    #[test]
    fn test_empty_paragraphs_keep_their_lines() {
        let xml = concat!(
            "<w:p w:rsidR=\"00A1\"><w:r><w:t>A</w:t></w:r></w:p>",
            "<w:p/>",
            "<w:p w:rsidR=\"00A2\"/>",
            "<w:p><w:r><w:t>B</w:t></w:r></w:p>",
            "<w:p/>",
        );
        assert_eq!(document_xml_text(xml), "A\n\n\nB\n");
    }

    #[test]
    fn test_paragraph_properties_are_not_paragraphs() {
        let xml = "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t>Title</w:t></w:r></w:p>";
        assert_eq!(document_xml_text(xml), "Title");
    }

    #[test]
    fn test_unescape_ampersand_last() {
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
    }
}
