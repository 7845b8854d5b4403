//! Stripe Checkout integration
//!
//! Uses Stripe's form-encoded REST API directly. Sessions carry the buyer and
//! tool in `metadata`, which comes back on the `checkout.session.completed`
//! webhook and becomes the access grant.

use access_core::{BillingInterval, CheckoutCompleted};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription(BillingInterval),
}

/// One-line-item checkout to create
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub name: String,
    pub description: String,
    pub amount_cents: i64,
    pub mode: CheckoutMode,
    pub user_id: Option<String>,
    pub tool_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Creates hosted checkout sessions
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }
}

/// Stripe API Error
#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    message: String,
}

fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mode = match request.mode {
        CheckoutMode::Payment => "payment",
        CheckoutMode::Subscription(_) => "subscription",
    };

    let mut form = vec![
        ("mode", mode.to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", "usd".to_string()),
        (
            "line_items[0][price_data][unit_amount]",
            request.amount_cents.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            request.name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]",
            request.description.clone(),
        ),
    ];

    if let CheckoutMode::Subscription(interval) = request.mode {
        let interval = match interval {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        };
        form.push((
            "line_items[0][price_data][recurring][interval]",
            interval.to_string(),
        ));
    }
    if let Some(user_id) = &request.user_id {
        form.push(("metadata[userId]", user_id.clone()));
        form.push(("client_reference_id", user_id.clone()));
    }
    if let Some(tool_id) = &request.tool_id {
        form.push(("metadata[toolId]", tool_id.clone()));
    }

    form
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(request))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<StripeError>(&text) {
                return Err(GatewayError::Rejected(err.error.message));
            }
            return Err(GatewayError::Rejected(format!(
                "Stripe API error: {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

// ============================================================================
// Webhook payloads
// ============================================================================

/// Stripe Webhook Event
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// `checkout.session.*` event object (subset of fields we need)
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// A bare id, or the expanded object
    #[serde(default)]
    pub payment_intent: Option<serde_json::Value>,
}

impl CheckoutSessionObject {
    fn metadata(&self, key: &str) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    pub fn into_completed(self) -> CheckoutCompleted {
        CheckoutCompleted {
            user_id: self.metadata("userId"),
            tool_id: self.metadata("toolId"),
            amount_cents: self.amount_total,
            payment_intent: self.payment_intent.as_ref().and_then(object_id),
            session_id: self.id,
        }
    }
}

/// `charge.*` event object
#[derive(Debug, Deserialize)]
pub struct ChargeObject {
    #[serde(default)]
    pub payment_intent: Option<serde_json::Value>,
}

impl ChargeObject {
    pub fn payment_intent_id(&self) -> Option<String> {
        self.payment_intent.as_ref().and_then(object_id)
    }
}

fn object_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Object(map) => map.get("id")?.as_str().map(str::to_string),
        _ => None,
    }
}
