//! PDF tools server
//!
//! REST endpoints over `pdftools-core` with payment-gated access from
//! `access-core`:
//!
//! - `/pdf/*`: convert, split, merge, compress and protect uploads
//! - `/api/*`: Stripe checkout, webhooks, access lookups and pricing
//!
//! Rate limiting needs the peer address, so it is applied in `main` where the
//! server is bound rather than in [`build_router`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod store;
pub mod stripe;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::billing::{
    handle_access, handle_create_payment_session, handle_pricing, handle_stripe_webhook,
};
use handlers::handle_health;
use handlers::pdf::{handle_compress, handle_convert, handle_merge, handle_protect, handle_split};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.settings.max_upload_bytes);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // PDF tools
        .route("/pdf/convert", post(handle_convert))
        .route("/pdf/split", post(handle_split))
        .route("/pdf/merge", post(handle_merge))
        .route("/pdf/compress", post(handle_compress))
        .route("/pdf/protect", post(handle_protect))
        // Payments and access
        .route("/api/webhooks/stripe", post(handle_stripe_webhook))
        .route(
            "/api/create-payment-session",
            post(handle_create_payment_session),
        )
        .route("/api/access/:user_id/:tool_id", get(handle_access))
        .route("/api/pricing", get(handle_pricing))
        // Apply middleware
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
