//! Upload endpoints
//!
//! Every endpoint takes `multipart/form-data` and answers with the produced
//! file as an attachment. PDF work runs on the blocking pool.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Arc;

use access_core::{AccessState, ANONYMOUS_USER};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use pdftools_core::{
    compress_document, convert_to_pdf, merge_documents, protect_document, split_by_spec,
    split_pages_by_spec, PageSpec,
};
use tracing::info;
use zip::write::SimpleFileOptions;

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the paying user when payment is required
pub const USER_ID_HEADER: &str = "x-user-id";

const PDF_CONTENT_TYPE: &str = "application/pdf";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// One uploaded file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Client-supplied name without any directory part
    fn base_name(&self) -> &str {
        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
            .unwrap_or("document.pdf")
    }
}

/// A parsed multipart body: file parts in arrival order plus text fields
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<(String, Upload)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);

            if file_name.is_some() {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read upload: {}", e))
                })?;
                form.files.push((
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                ));
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read field {}: {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// The first file uploaded under `name`
    fn take_file(&mut self, name: &str) -> Option<Upload> {
        let position = self.files.iter().position(|(n, _)| n == name)?;
        Some(self.files.remove(position).1)
    }

    /// Every file uploaded under any of `names`, in arrival order
    fn take_files(&mut self, names: &[&str]) -> Vec<Upload> {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(n, _)| names.contains(&n.as_str()));
        self.files = rest;
        taken.into_iter().map(|(_, upload)| upload).collect()
    }

    /// A text field, trimmed; blank counts as absent
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

fn no_file() -> ApiError {
    ApiError::MissingInput("No file provided".to_string())
}

/// Refuse paid tools to users without a live grant, when payment is enforced.
/// Grants filed under the anonymous user unlock nothing.
async fn require_access(
    state: &AppState,
    headers: &HeaderMap,
    tool_id: &str,
) -> Result<(), ApiError> {
    if !state.settings.require_payment {
        return Ok(());
    }

    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != ANONYMOUS_USER)
        .ok_or_else(|| ApiError::PaymentRequired(format!("Payment required for {}", tool_id)))?;

    match state.ledger.access_state(user_id, tool_id).await? {
        AccessState::Granted { .. } => Ok(()),
        AccessState::Pending => Err(ApiError::PaymentRequired(
            "Payment is still being confirmed, please retry shortly".to_string(),
        )),
        AccessState::Denied => {
            info!(user_id, tool_id, "access denied");
            Err(ApiError::PaymentRequired(format!(
                "Payment required for {}",
                tool_id
            )))
        }
    }
}

/// Run CPU-bound PDF work off the async workers
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("PDF task failed: {}", e)))?
}

/// Keep a client-supplied name safe for a quoted header parameter
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(file_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Bundle single-page documents as `page-<n>.pdf` entries
fn zip_pages(pages: Vec<(u32, Vec<u8>)>) -> Result<Vec<u8>, ApiError> {
    let zip_error = |e: zip::result::ZipError| ApiError::Internal(format!("ZIP failed: {}", e));

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (page_number, bytes) in pages {
        writer
            .start_file(format!("page-{}.pdf", page_number), options)
            .map_err(zip_error)?;
        writer
            .write_all(&bytes)
            .map_err(|e| ApiError::Internal(format!("ZIP failed: {}", e)))?;
    }

    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// Handler: POST /pdf/convert
pub async fn handle_convert(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file("file").ok_or_else(no_file)?;

    info!(
        file_name = ?upload.file_name,
        content_type = ?upload.content_type,
        size = upload.bytes.len(),
        "converting upload"
    );

    let output = run_blocking(move || {
        convert_to_pdf(
            &upload.bytes,
            upload.content_type.as_deref(),
            upload.file_name.as_deref(),
        )
        .map_err(ApiError::pdf("convert"))
    })
    .await?;

    Ok(attachment(output, PDF_CONTENT_TYPE, "converted.pdf"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitMode {
    /// Selected pages in one document
    Combined,
    /// One document per selected page, zipped
    Pages,
}

impl SplitMode {
    fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value {
            None | Some("combined") => Ok(SplitMode::Combined),
            Some("pages") => Ok(SplitMode::Pages),
            Some(other) => Err(ApiError::InvalidRequest(format!(
                "Unknown split mode: {}",
                other
            ))),
        }
    }
}

/// Handler: POST /pdf/split
pub async fn handle_split(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_access(&state, &headers, "split").await?;

    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file("file").ok_or_else(no_file)?;
    let page_spec = form
        .field("pageNumbers")
        .ok_or_else(|| ApiError::MissingInput("Page numbers are required".to_string()))?
        .to_string();
    let mode = SplitMode::parse(form.field("mode"))?;

    info!(file_name = ?upload.file_name, page_spec = %page_spec, ?mode, "splitting");

    let spec = PageSpec::parse(&page_spec);

    match mode {
        SplitMode::Combined => {
            let output = run_blocking(move || {
                split_by_spec(&upload.bytes, &spec).map_err(ApiError::pdf("split"))
            })
            .await?;

            Ok(attachment(output, PDF_CONTENT_TYPE, "split-pages.pdf"))
        }
        SplitMode::Pages => {
            let output = run_blocking(move || {
                let pages =
                    split_pages_by_spec(&upload.bytes, &spec).map_err(ApiError::pdf("split"))?;
                zip_pages(pages)
            })
            .await?;

            Ok(attachment(output, ZIP_CONTENT_TYPE, "split-pages.zip"))
        }
    }
}

/// Handler: POST /pdf/merge
pub async fn handle_merge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_access(&state, &headers, "merge").await?;

    let mut form = UploadForm::read(multipart).await?;
    let uploads = form.take_files(&["files", "files[]"]);
    if uploads.len() < 2 {
        return Err(ApiError::MissingInput(
            "At least two PDF files are required".to_string(),
        ));
    }

    info!(count = uploads.len(), "merging");

    let output = run_blocking(move || {
        let inputs: Vec<Vec<u8>> = uploads.iter().map(|u| u.bytes.to_vec()).collect();
        merge_documents(&inputs).map_err(ApiError::pdf("merge"))
    })
    .await?;

    Ok(attachment(output, PDF_CONTENT_TYPE, "merged.pdf"))
}

/// Handler: POST /pdf/compress
pub async fn handle_compress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_access(&state, &headers, "compress").await?;

    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file("file").ok_or_else(no_file)?;
    let file_name = format!("compressed_{}", upload.base_name());
    let input_size = upload.bytes.len();

    let output = run_blocking(move || {
        compress_document(&upload.bytes).map_err(ApiError::pdf("compress"))
    })
    .await?;

    info!(input_size, output_size = output.len(), "compressed");

    Ok(attachment(output, PDF_CONTENT_TYPE, &file_name))
}

/// Handler: POST /pdf/protect
pub async fn handle_protect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    require_access(&state, &headers, "protect").await?;

    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file("file").ok_or_else(no_file)?;
    // Passwords are used as typed, surrounding spaces included
    let password = form
        .fields
        .remove("password")
        .filter(|password| !password.is_empty())
        .ok_or_else(|| ApiError::MissingInput("Password is required".to_string()))?;
    let file_name = format!("protected_{}", upload.base_name());

    let output = run_blocking(move || {
        protect_document(&upload.bytes, &password).map_err(ApiError::pdf("protect"))
    })
    .await?;

    Ok(attachment(output, PDF_CONTENT_TYPE, &file_name))
}
