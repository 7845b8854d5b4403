//! Error types for the PDF tools API

use crate::stripe::GatewayError;
use access_core::{SignatureError, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftools_core::PdfToolError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{operation} failed: {source}")]
    Pdf {
        operation: &'static str,
        #[source]
        source: PdfToolError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Attach the failing operation to a PDF error
    pub fn pdf(operation: &'static str) -> impl FnOnce(PdfToolError) -> ApiError {
        move |source| ApiError::Pdf { operation, source }
    }
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        ApiError::SignatureVerification(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingInput(msg) | ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::SignatureVerification(reason) => {
                tracing::warn!("Webhook rejected: {}", reason);
                (
                    StatusCode::BAD_REQUEST,
                    format!("Webhook Error: {}", reason),
                )
            }
            ApiError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg.clone()),
            ApiError::NotConfigured(what) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} is not configured", what),
            ),
            ApiError::Pdf { operation, source } => {
                tracing::error!(operation, "PDF operation failed: {}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    source.user_message().to_string(),
                )
            }
            ApiError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to access payment records".to_string(),
                )
            }
            ApiError::Gateway(e) => {
                tracing::error!("Payment gateway error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create payment session".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::MissingInput("No file provided".into()), 400),
            (ApiError::InvalidRequest("bad".into()), 400),
            (SignatureError::Mismatch.into(), 400),
            (ApiError::PaymentRequired("pay".into()), 402),
            (ApiError::NotConfigured("Stripe"), 503),
            (StoreError::Backend("down".into()).into(), 500),
            (ApiError::Internal("boom".into()), 500),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status().as_u16(), status);
        }
    }

    #[tokio::test]
    async fn test_pdf_errors_hide_library_details() {
        let error = ApiError::pdf("merge")(PdfToolError::MergeFailure {
            index: 1,
            reason: "xref table broken at offset 9913".into(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 500);
        assert!(json["error"].as_str().unwrap().contains("not password protected"));
        assert!(!json["error"].as_str().unwrap().contains("xref"));
    }
}
