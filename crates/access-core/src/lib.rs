//! Payment-backed, time-boxed access to paid tools
//!
//! A successful payment writes an [`AccessRecord`] that grants one user one
//! tool for a fixed window. Access is a point-in-time query over those
//! records, see [`evaluate_access`].

pub mod clock;
pub mod ledger;
pub mod pricing;
pub mod record;
pub mod store;
pub mod webhook;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{grant_window, AccessLedger, CheckoutCompleted, CheckoutStarted, GRANT_WINDOW_HOURS};
pub use pricing::{
    find_donation, find_plan, BillingInterval, DonationTier, PlanType, PricingPlan, DONATIONS, PLANS,
};
pub use record::{evaluate_access, AccessRecord, AccessState, PaymentStatus, ANONYMOUS_USER};
pub use store::{AccessStore, InMemoryAccessStore, StoreError};
pub use webhook::{sign_payload, verify_signature, SignatureError};
