//! Command-line and environment configuration

use clap::Parser;

/// Command-line arguments for the PDF tools server.
///
/// Every option can also come from the environment (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "pdftools-api")]
#[command(about = "PDF tools server with payment-gated access")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite database holding payment records
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:pdftools.db?mode=rwc")]
    pub database_url: String,

    /// Stripe API key; checkout creation is disabled without it
    #[arg(long, env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    /// Stripe webhook signing secret; webhooks are rejected without it
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", hide_env_values = true)]
    pub stripe_webhook_secret: Option<String>,

    /// Base URL used for checkout success and cancel redirects
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
    pub public_base_url: String,

    /// Maximum request body size in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "50")]
    pub max_upload_mb: usize,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "RATE_LIMIT", default_value = "10")]
    pub rate_limit: u32,

    /// Require a paid grant (x-user-id header) for split, merge, compress and protect
    #[arg(long, env = "REQUIRE_PAYMENT")]
    pub require_payment: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Milliseconds for the per-IP limiter to replenish one request
    pub fn replenish_ms(&self) -> u64 {
        (1000 / u64::from(self.rate_limit.max(1))).max(1)
    }

    /// Requests an IP may send in a burst: twice the per-second rate
    pub fn burst_size(&self) -> u32 {
        self.rate_limit.max(1).saturating_mul(2)
    }
}

/// Runtime settings the handlers read
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_upload_bytes: usize,
    pub require_payment: bool,
    pub public_base_url: String,
    pub webhook_secret: Option<String>,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            require_payment: args.require_payment,
            public_base_url: args.public_base_url.trim_end_matches('/').to_string(),
            webhook_secret: args
                .stripe_webhook_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            require_payment: false,
            public_base_url: "http://localhost:3000".to_string(),
            webhook_secret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["pdftools-api"]);
        assert_eq!(args.port, 3000);
        assert_eq!(args.rate_limit, 10);
        assert!(!args.verbose);
    }

    #[test]
    fn test_rate_limit_quota() {
        let args = Args::parse_from(["pdftools-api", "--rate-limit", "4"]);
        assert_eq!(args.replenish_ms(), 250);
        assert_eq!(args.burst_size(), 8);

        let args = Args::parse_from(["pdftools-api", "--rate-limit", "0"]);
        assert_eq!(args.replenish_ms(), 1000);
        assert_eq!(args.burst_size(), 2);
    }

    #[test]
    fn test_huge_rate_limit_saturates() {
        let args = Args::parse_from(["pdftools-api", "--rate-limit", &u32::MAX.to_string()]);
        assert_eq!(args.burst_size(), u32::MAX);
        assert_eq!(args.replenish_ms(), 1);
    }

    #[test]
    fn test_settings_from_args() {
        let args = Args::parse_from([
            "pdftools-api",
            "--max-upload-mb",
            "2",
            "--public-base-url",
            "https://pdf.example.com/",
            "--stripe-webhook-secret",
            "",
            "--require-payment",
        ]);
        let settings = Settings::from_args(&args);

        assert_eq!(settings.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.public_base_url, "https://pdf.example.com");
        assert!(settings.require_payment);
        assert!(settings.webhook_secret.is_none());
    }
}
