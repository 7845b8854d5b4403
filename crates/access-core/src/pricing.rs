//! Plan catalog and donation tiers

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanType {
    OneTime,
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price_cents: i64,
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<BillingInterval>,
    pub features: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationTier {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub amount_cents: i64,
}

pub const PLANS: &[PricingPlan] = &[
    PricingPlan {
        id: "compress",
        name: "Compress PDF",
        description: "Reduce PDF file size while maintaining quality",
        price_cents: 199,
        plan_type: PlanType::OneTime,
        interval: None,
        features: &[
            "Compress up to 10MB PDFs",
            "Maintain PDF quality",
            "Instant download",
        ],
    },
    PricingPlan {
        id: "merge",
        name: "Merge PDFs",
        description: "Combine multiple PDFs into one",
        price_cents: 199,
        plan_type: PlanType::OneTime,
        interval: None,
        features: &[
            "Merge up to 5 PDFs",
            "Preserve original quality",
            "Instant download",
        ],
    },
    PricingPlan {
        id: "split",
        name: "Split PDF",
        description: "Split PDF into multiple files",
        price_cents: 199,
        plan_type: PlanType::OneTime,
        interval: None,
        features: &[
            "Split by page numbers",
            "Download as ZIP",
            "Instant processing",
        ],
    },
    PricingPlan {
        id: "protect",
        name: "Protect PDF",
        description: "Add password protection",
        price_cents: 99,
        plan_type: PlanType::OneTime,
        interval: None,
        features: &[
            "Strong password protection",
            "Preserve original quality",
            "Instant download",
        ],
    },
    PricingPlan {
        id: "pro_monthly",
        name: "Pro Monthly",
        description: "Unlimited access to all PDF tools",
        price_cents: 199,
        plan_type: PlanType::Subscription,
        interval: Some(BillingInterval::Month),
        features: &[
            "Unlimited PDF processing",
            "All tools included",
            "Priority support",
            "No file size limits",
            "Batch processing",
        ],
    },
    PricingPlan {
        id: "pro_yearly",
        name: "Pro Yearly",
        description: "Unlimited access to all PDF tools",
        price_cents: 199,
        plan_type: PlanType::Subscription,
        interval: Some(BillingInterval::Year),
        features: &[
            "Unlimited PDF processing",
            "All tools included",
            "Priority support",
            "No file size limits",
            "Batch processing",
            "Save 50% compared to monthly",
        ],
    },
];

pub const DONATIONS: &[DonationTier] = &[
    DonationTier {
        id: "small",
        name: "Small Support",
        description: "Support our service with a small donation",
        amount_cents: 199,
    },
    DonationTier {
        id: "medium",
        name: "Medium Support",
        description: "Support our service with a medium donation",
        amount_cents: 499,
    },
    DonationTier {
        id: "large",
        name: "Large Support",
        description: "Support our service with a large donation",
        amount_cents: 999,
    },
];

pub fn find_plan(id: &str) -> Option<&'static PricingPlan> {
    PLANS.iter().find(|plan| plan.id == id)
}

pub fn find_donation(id: &str) -> Option<&'static DonationTier> {
    DONATIONS.iter().find(|tier| tier.id == id)
}
