//! PDF tools server binary

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdftools_api::build_router;
use pdftools_api::config::Args;
use pdftools_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "pdftools_api=debug,access_core=debug,pdftools_core=debug,tower_http=debug"
    } else {
        "pdftools_api=info,access_core=info,tower_http=debug"
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF tools server on {}:{}", args.host, args.port);

    // Create rate limiter configuration; one request replenishes every 1/rate seconds
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(args.replenish_ms())
            .burst_size(args.burst_size())
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit: {}", args.rate_limit))?,
    );

    // Create shared state
    let state = Arc::new(AppState::new(&args).await?);

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!("Payment required: {}", args.require_payment);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
