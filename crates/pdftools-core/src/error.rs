use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolError {
    #[error("Unsupported file type for conversion: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load PDF (corrupt or password protected): {0}")]
    CorruptOrEncryptedInput(String),

    #[error("Compressed output failed validation: {0}")]
    CompressionIntegrity(String),

    #[error("Failed to merge document {index}: {reason}")]
    MergeFailure { index: usize, reason: String },

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}

impl PdfToolError {
    /// Message that is safe to show to a client. Library details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            PdfToolError::UnsupportedFormat(_) => "Unsupported file type for conversion",
            PdfToolError::CorruptOrEncryptedInput(_) => {
                "Failed to read the PDF. Please ensure the file is a valid PDF and not password protected."
            }
            PdfToolError::CompressionIntegrity(_) => {
                "Failed to compress PDF while maintaining validity"
            }
            PdfToolError::MergeFailure { .. } => {
                "Failed to merge PDFs. Please ensure all files are valid PDFs and not password protected."
            }
            PdfToolError::InvalidPassword(_) => "The password cannot be used to protect this PDF",
            PdfToolError::OperationError(_) => "Failed to process PDF",
        }
    }
}
