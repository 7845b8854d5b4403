//! Application state for the PDF tools API

use crate::config::{Args, Settings};
use crate::store::SqliteAccessStore;
use crate::stripe::{CheckoutGateway, StripeClient};
use access_core::{AccessLedger, AccessStore, Clock, SystemClock};
use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

pub struct AppState {
    pub ledger: AccessLedger,
    /// Absent when no Stripe key is configured
    pub checkout: Option<Arc<dyn CheckoutGateway>>,
    pub settings: Settings,
}

impl AppState {
    pub async fn new(args: &Args) -> Result<Self> {
        tracing::info!("Connecting to database: {}", args.database_url);

        let pool = connect_pool(&args.database_url).await?;
        run_migrations(&pool).await?;

        let checkout = match args.stripe_secret_key.as_deref() {
            Some(key) if !key.is_empty() => {
                Some(Arc::new(StripeClient::new(key)) as Arc<dyn CheckoutGateway>)
            }
            _ => {
                tracing::warn!("STRIPE_SECRET_KEY not set; payment sessions are disabled");
                None
            }
        };

        Ok(Self::from_parts(
            Arc::new(SqliteAccessStore::new(pool)),
            Arc::new(SystemClock),
            checkout,
            Settings::from_args(args),
        ))
    }

    pub fn from_parts(
        store: Arc<dyn AccessStore>,
        clock: Arc<dyn Clock>,
        checkout: Option<Arc<dyn CheckoutGateway>>,
        settings: Settings,
    ) -> Self {
        Self {
            ledger: AccessLedger::new(store, clock),
            checkout,
            settings,
        }
    }
}

/// Open the pool. In-memory databases are per connection, so they get exactly one.
pub async fn connect_pool(database_url: &str) -> Result<SqlitePool> {
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            tool_id TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            status TEXT NOT NULL,
            payment_intent TEXT,
            timestamp_ms INTEGER NOT NULL,
            expires_at_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Access checks and refunds
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_payments_user_tool ON payments(user_id, tool_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_payments_intent ON payments(payment_intent)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Migrations complete");
    Ok(())
}
