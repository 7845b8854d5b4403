//! HTTP handlers
//!
//! - [`pdf`]: multipart upload endpoints under `/pdf`
//! - [`billing`]: checkout, webhooks, access lookups and pricing under `/api`

pub mod billing;
pub mod pdf;

use axum::Json;
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftools-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
