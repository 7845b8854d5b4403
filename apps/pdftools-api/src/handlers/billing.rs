//! Checkout, webhook and access endpoints

use std::sync::Arc;

use access_core::{
    find_donation, find_plan, verify_signature, AccessState, CheckoutStarted, DonationTier,
    PlanType, PricingPlan, ANONYMOUS_USER, DONATIONS, PLANS,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{
    ChargeObject, CheckoutMode, CheckoutRequest, CheckoutSessionObject, StripeEvent,
};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Generic webhook response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// Handler: POST /api/webhooks/stripe
///
/// The body is verified as received, before any parsing.
pub async fn handle_stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state
        .settings
        .webhook_secret
        .as_deref()
        .ok_or(ApiError::NotConfigured("Stripe webhook secret"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            ApiError::SignatureVerification("missing stripe-signature header".to_string())
        })?;

    verify_signature(&body, signature, secret, state.ledger.now())?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid webhook payload: {}", e)))?;

    info!(event_id = ?event.id, event_type = %event.event_type, "Received Stripe webhook");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = parse_object(event.data.object)?;
            state
                .ledger
                .complete_checkout(session.into_completed())
                .await?;
        }
        "checkout.session.expired" => {
            let session: CheckoutSessionObject = parse_object(event.data.object)?;
            state.ledger.fail_checkout(&session.id).await?;
        }
        "charge.refunded" => {
            let charge: ChargeObject = parse_object(event.data.object)?;
            match charge.payment_intent_id() {
                Some(payment_intent) => {
                    state.ledger.refund_payment(&payment_intent).await?;
                }
                None => warn!("Refunded charge has no payment intent"),
            }
        }
        "payment_intent.succeeded" => info!("Payment succeeded"),
        "payment_intent.payment_failed" => warn!("Payment failed"),
        other => debug!("Unhandled webhook event type: {}", other),
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn parse_object<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(object)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid webhook object: {}", e)))
}

/// Checkout request body: a tool purchase or a donation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    pub tool_id: Option<String>,
    pub donation_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionResponse {
    pub session_id: String,
    pub url: Option<String>,
}

enum Purchase {
    Tool(&'static PricingPlan),
    Donation(&'static DonationTier),
}

impl Purchase {
    fn from_request(request: &CreatePaymentSessionRequest) -> Result<Self, ApiError> {
        match (request.tool_id.as_deref(), request.donation_type.as_deref()) {
            (Some(tool_id), _) => find_plan(tool_id)
                .map(Purchase::Tool)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown tool: {}", tool_id))),
            (None, Some(donation)) => find_donation(donation)
                .map(Purchase::Donation)
                .ok_or_else(|| {
                    ApiError::InvalidRequest(format!("Unknown donation type: {}", donation))
                }),
            (None, None) => Err(ApiError::InvalidRequest(
                "toolId or donationType is required".to_string(),
            )),
        }
    }

    /// The user the purchase is for. Tool access is granted per user, so a tool
    /// purchase needs a real one; donations may stay anonymous.
    fn buyer(&self, user_id: Option<&str>) -> Result<Option<String>, ApiError> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty());
        match (self, user_id) {
            (Purchase::Tool(_), None) => Err(ApiError::InvalidRequest(
                "userId is required for tool purchases".to_string(),
            )),
            (Purchase::Tool(_), Some(ANONYMOUS_USER)) => Err(ApiError::InvalidRequest(format!(
                "userId must not be {}",
                ANONYMOUS_USER
            ))),
            (_, user_id) => Ok(user_id.map(str::to_string)),
        }
    }

    fn checkout_request(
        &self,
        user_id: Option<String>,
        base_url: &str,
    ) -> CheckoutRequest {
        let success_url = format!("{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}", base_url);
        let cancel_url = format!("{}/pricing", base_url);

        match self {
            Purchase::Tool(plan) => CheckoutRequest {
                name: plan.name.to_string(),
                description: plan.description.to_string(),
                amount_cents: plan.price_cents,
                mode: match (plan.plan_type, plan.interval) {
                    (PlanType::Subscription, Some(interval)) => {
                        CheckoutMode::Subscription(interval)
                    }
                    _ => CheckoutMode::Payment,
                },
                user_id,
                tool_id: Some(plan.id.to_string()),
                success_url,
                cancel_url,
            },
            Purchase::Donation(tier) => CheckoutRequest {
                name: tier.name.to_string(),
                description: tier.description.to_string(),
                amount_cents: tier.amount_cents,
                mode: CheckoutMode::Payment,
                user_id,
                tool_id: None,
                success_url,
                cancel_url,
            },
        }
    }
}

/// Handler: POST /api/create-payment-session
///
/// Prices always come from the server-side catalog.
pub async fn handle_create_payment_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePaymentSessionRequest>,
) -> Result<Json<CreatePaymentSessionResponse>, ApiError> {
    let gateway = state
        .checkout
        .as_ref()
        .ok_or(ApiError::NotConfigured("Stripe"))?;

    let purchase = Purchase::from_request(&request)?;
    let user_id = purchase.buyer(request.user_id.as_deref())?;
    let checkout = purchase.checkout_request(user_id.clone(), &state.settings.public_base_url);

    let session = gateway.create_checkout_session(&checkout).await?;

    if let Purchase::Tool(plan) = purchase {
        state
            .ledger
            .record_pending_checkout(CheckoutStarted {
                session_id: session.id.clone(),
                user_id,
                tool_id: plan.id.to_string(),
                amount_cents: plan.price_cents,
            })
            .await?;
    }

    info!(session_id = %session.id, "Checkout session created");

    Ok(Json(CreatePaymentSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub user_id: String,
    pub tool_id: String,
    pub has_access: bool,
    pub state: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Handler: GET /api/access/:user_id/:tool_id
pub async fn handle_access(
    State(state): State<Arc<AppState>>,
    Path((user_id, tool_id)): Path<(String, String)>,
) -> Result<Json<AccessResponse>, ApiError> {
    let access: AccessState = state.ledger.access_state(&user_id, &tool_id).await?;

    Ok(Json(AccessResponse {
        has_access: access.is_granted(),
        state: access.as_str(),
        expires_at: access.expires_at(),
        user_id,
        tool_id,
    }))
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub plans: &'static [PricingPlan],
    pub donations: &'static [DonationTier],
}

/// Handler: GET /api/pricing
pub async fn handle_pricing() -> Json<PricingResponse> {
    Json(PricingResponse {
        plans: PLANS,
        donations: DONATIONS,
    })
}
