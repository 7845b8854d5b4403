//! Payment lifecycle on top of an [`AccessStore`]
//!
//! ```text
//! checkout created ──► pending ──► completed ──► refunded
//!                         │
//!                         └──────► failed (session expired)
//! ```
//!
//! Completed grants last [`GRANT_WINDOW_HOURS`] from the moment the gateway
//! confirmation is processed, whatever the plan.

use crate::clock::Clock;
use crate::record::{evaluate_access, AccessRecord, AccessState, PaymentStatus, ANONYMOUS_USER};
use crate::store::{AccessStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Lifetime of a completed grant, and of a pending checkout
pub const GRANT_WINDOW_HOURS: i64 = 24;

pub fn grant_window() -> Duration {
    Duration::hours(GRANT_WINDOW_HOURS)
}

/// A checkout session that was just created
#[derive(Debug, Clone)]
pub struct CheckoutStarted {
    pub session_id: String,
    pub user_id: Option<String>,
    pub tool_id: String,
    pub amount_cents: i64,
}

/// What the gateway reports about a completed checkout session
#[derive(Debug, Clone, Default)]
pub struct CheckoutCompleted {
    pub session_id: String,
    pub user_id: Option<String>,
    pub tool_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub payment_intent: Option<String>,
}

pub struct AccessLedger {
    store: Arc<dyn AccessStore>,
    clock: Arc<dyn Clock>,
}

impl AccessLedger {
    pub fn new(store: Arc<dyn AccessStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Stamp `record` with the current time and store it.
    ///
    /// Failures are logged and reported as `false`.
    pub async fn create_payment_record(&self, mut record: AccessRecord) -> bool {
        record.timestamp = self.now();
        match self.store.upsert(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error creating payment record: {}", e);
                false
            }
        }
    }

    /// Whether `user_id` currently holds a live grant for `tool_id`.
    ///
    /// Store failures deny access.
    pub async fn check_user_access(&self, user_id: &str, tool_id: &str) -> bool {
        match self.access_state(user_id, tool_id).await {
            Ok(state) => state.is_granted(),
            Err(e) => {
                tracing::error!("Error checking user access: {}", e);
                false
            }
        }
    }

    pub async fn access_state(
        &self,
        user_id: &str,
        tool_id: &str,
    ) -> Result<AccessState, StoreError> {
        let records = self.store.records_for(user_id, tool_id).await?;
        Ok(evaluate_access(&records, self.now()))
    }

    /// Record a checkout that has not been paid yet
    pub async fn record_pending_checkout(
        &self,
        checkout: CheckoutStarted,
    ) -> Result<AccessRecord, StoreError> {
        let now = self.now();
        let record = AccessRecord {
            user_id: checkout
                .user_id
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            tool_id: checkout.tool_id,
            amount_cents: checkout.amount_cents,
            status: PaymentStatus::Pending,
            session_id: checkout.session_id,
            payment_intent: None,
            timestamp: now,
            expires_at: now + grant_window(),
        };
        self.store.upsert(record.clone()).await?;

        tracing::info!(
            session_id = %record.session_id,
            tool_id = %record.tool_id,
            "checkout pending"
        );
        Ok(record)
    }

    /// Turn a checkout into a live grant.
    ///
    /// Redelivered confirmations return the stored record unchanged, so a
    /// retry neither extends a grant nor revives a refunded one.
    pub async fn complete_checkout(
        &self,
        completed: CheckoutCompleted,
    ) -> Result<AccessRecord, StoreError> {
        let existing = self.store.find_by_session(&completed.session_id).await?;

        if let Some(existing) = &existing {
            if matches!(
                existing.status,
                PaymentStatus::Completed | PaymentStatus::Refunded
            ) {
                tracing::info!(
                    session_id = %existing.session_id,
                    status = %existing.status,
                    "duplicate checkout confirmation ignored"
                );
                return Ok(existing.clone());
            }
        }

        let now = self.now();
        let record = AccessRecord {
            user_id: completed
                .user_id
                .filter(|id| !id.is_empty())
                .or_else(|| existing.as_ref().map(|r| r.user_id.clone()))
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            tool_id: completed
                .tool_id
                .filter(|id| !id.is_empty())
                .or_else(|| existing.as_ref().map(|r| r.tool_id.clone()))
                .unwrap_or_default(),
            amount_cents: completed
                .amount_cents
                .or_else(|| existing.as_ref().map(|r| r.amount_cents))
                .unwrap_or(0),
            status: PaymentStatus::Completed,
            session_id: completed.session_id,
            payment_intent: completed
                .payment_intent
                .or_else(|| existing.and_then(|r| r.payment_intent)),
            timestamp: now,
            expires_at: now + grant_window(),
        };
        self.store.upsert(record.clone()).await?;

        tracing::info!(
            session_id = %record.session_id,
            user_id = %record.user_id,
            tool_id = %record.tool_id,
            expires_at = %record.expires_at,
            "access granted"
        );
        Ok(record)
    }

    /// Mark an abandoned checkout as failed. Returns whether a pending record changed.
    pub async fn fail_checkout(&self, session_id: &str) -> Result<bool, StoreError> {
        match self.store.find_by_session(session_id).await? {
            Some(record) if record.status == PaymentStatus::Pending => {
                self.store
                    .set_status_by_session(session_id, PaymentStatus::Failed)
                    .await?;
                tracing::info!(session_id, "checkout expired");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Revoke every grant paid by `payment_intent`. Returns the number of records changed.
    pub async fn refund_payment(&self, payment_intent: &str) -> Result<u64, StoreError> {
        let changed = self
            .store
            .set_status_by_payment_intent(payment_intent, PaymentStatus::Refunded)
            .await?;
        tracing::info!(payment_intent, changed, "payment refunded");
        Ok(changed)
    }
}
