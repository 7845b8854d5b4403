//! Plain text rendering
//!
//! Helvetica 12 pt on A4 with 50 pt margins. Long lines wrap at word
//! boundaries and overflow continues on new pages.

use super::PdfBuilder;
use crate::error::PdfToolError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, StringFormat};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 14.4;

/// Characters per line that fit the text column at an average Helvetica advance
const MAX_LINE_CHARS: usize = 75;

/// Lines that fit between the top and bottom margins
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2.0 * MARGIN) / LEADING) as usize;

pub(super) fn text_to_pdf(text: &str) -> Result<Vec<u8>, PdfToolError> {
    let mut builder = PdfBuilder::new();
    let font_id = builder.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    for page in layout_lines(text) {
        let content = page_content(&page)?;
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        builder.append_page(PAGE_WIDTH, PAGE_HEIGHT, resources, content);
    }

    builder.finish()
}

/// Break `text` into pages of wrapped lines. Always returns at least one page.
pub fn layout_lines(text: &str) -> Vec<Vec<String>> {
    let normalized = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', "    ");

    let mut lines = Vec::new();
    for raw in normalized.split('\n') {
        if raw.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        lines.extend(
            textwrap::wrap(raw, MAX_LINE_CHARS)
                .into_iter()
                .map(|line| line.into_owned()),
        );
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return vec![Vec::new()];
    }

    lines
        .chunks(LINES_PER_PAGE)
        .map(|chunk| chunk.to_vec())
        .collect()
}

fn page_content(lines: &[String]) -> Result<Vec<u8>, PdfToolError> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), FONT_SIZE.into()],
        ),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new(
            "Td",
            vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()],
        ),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| PdfToolError::OperationError(format!("Content encoding failed: {}", e)))
}

/// The standard 14 fonts only cover Latin-1; anything else becomes `?`
fn win_ansi_bytes(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => b'?',
        })
        .collect()
}
