//! Access records and point-in-time access evaluation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User id recorded when a checkout carried none
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Checkout created, gateway confirmation not yet received
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// One payment event. Records are never deleted; expiry is checked at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    pub user_id: String,
    pub tool_id: String,
    /// Captured amount in minor currency units
    pub amount_cents: i64,
    pub status: PaymentStatus,
    /// Checkout session id; unique per record
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessRecord {
    /// Amount in major currency units
    pub fn amount(&self) -> f64 {
        self.amount_cents as f64 / 100.0
    }

    /// Completed and not yet expired
    pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Completed && self.expires_at > now
    }

    fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending && self.expires_at > now
    }
}

/// Answer to "may this user use this tool right now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// A completed record is live until `expires_at`
    Granted { expires_at: DateTime<Utc> },
    /// Only a checkout that has not been confirmed yet
    Pending,
    Denied,
}

impl AccessState {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessState::Granted { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessState::Granted { .. } => "granted",
            AccessState::Pending => "pending",
            AccessState::Denied => "denied",
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AccessState::Granted { expires_at } => Some(*expires_at),
            _ => None,
        }
    }
}

/// Evaluate the records of one `(user, tool)` pair at `now`.
///
/// When several grants are live the latest expiry wins.
pub fn evaluate_access(records: &[AccessRecord], now: DateTime<Utc>) -> AccessState {
    let latest_grant = records
        .iter()
        .filter(|r| r.grants_access_at(now))
        .map(|r| r.expires_at)
        .max();

    match latest_grant {
        Some(expires_at) => AccessState::Granted { expires_at },
        None if records.iter().any(|r| r.is_pending_at(now)) => AccessState::Pending,
        None => AccessState::Denied,
    }
}
