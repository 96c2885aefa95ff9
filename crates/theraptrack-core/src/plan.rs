//! Subscription plan catalog types.
//!
//! A plan carries one price per (user type × billing period). Prices are integer
//! paise and express the per-month rate for that billing period, so a yearly
//! price of 700 means ₹7/month billed as 12 months.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};
use crate::PlanId;

// ============================================================================
// Billing Periods
// ============================================================================

/// Billing period granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    /// Billed every month.
    Monthly,
    /// Billed every three months.
    Quarterly,
    /// Billed every twelve months.
    Yearly,
}

impl BillingPeriod {
    /// All billing periods, in display order.
    pub const ALL: [Self; 3] = [Self::Monthly, Self::Quarterly, Self::Yearly];

    /// Number of months covered by one billing cycle.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }

    /// Multiplier applied to the per-month price when valuing a plan.
    #[must_use]
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }

    /// Wire name of the period.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingPeriod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(BillingError::InvalidBillingPeriod(other.to_string())),
        }
    }
}

/// Who a price applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// An independent partner (therapist) paying for themselves.
    Individual,
    /// An organization paying for its tenant.
    Organization,
}

impl UserType {
    /// Wire name of the user type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Pricing
// ============================================================================

/// Price and availability of a plan for one billing period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPricing {
    /// Per-month price in paise, if priced.
    #[serde(default)]
    pub price_paise: Option<i64>,
    /// Whether this period is offered.
    #[serde(default)]
    pub enabled: bool,
}

impl PeriodPricing {
    /// An enabled period with the given per-month price.
    #[must_use]
    pub const fn enabled(price_paise: i64) -> Self {
        Self {
            price_paise: Some(price_paise),
            enabled: true,
        }
    }
}

/// Pricing for every billing period of one user type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    /// Monthly billing.
    #[serde(default)]
    pub monthly: PeriodPricing,
    /// Quarterly billing.
    #[serde(default)]
    pub quarterly: PeriodPricing,
    /// Yearly billing.
    #[serde(default)]
    pub yearly: PeriodPricing,
}

impl PricingTable {
    /// Get the pricing entry for a period.
    #[must_use]
    pub const fn get(&self, period: BillingPeriod) -> &PeriodPricing {
        match period {
            BillingPeriod::Monthly => &self.monthly,
            BillingPeriod::Quarterly => &self.quarterly,
            BillingPeriod::Yearly => &self.yearly,
        }
    }

    /// Whether any period is offered.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        BillingPeriod::ALL.iter().any(|p| self.get(*p).enabled)
    }
}

// ============================================================================
// Features and Limits
// ============================================================================

/// Support level bundled with a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTier {
    /// Email support.
    #[default]
    Email,
    /// Priority email and chat.
    Priority,
    /// Named account manager.
    Dedicated,
}

/// Feature flags unlocked by a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanFeatures {
    /// Video sessions with clients.
    pub video_sessions: bool,
    /// WhatsApp reminders and notifications.
    pub whatsapp_notifications: bool,
    /// Session and questionnaire reports.
    pub advanced_reports: bool,
    /// Custom branding on client-facing pages.
    pub custom_branding: bool,
    /// Practice analytics dashboard.
    pub analytics: bool,
    /// Support tier.
    pub support: SupportTier,
}

/// Inclusive count bounds. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountBounds {
    /// Lower bound.
    pub min: Option<u32>,
    /// Upper bound.
    pub max: Option<u32>,
}

impl CountBounds {
    /// Whether `n` lies within the bounds.
    #[must_use]
    pub fn contains(&self, n: u32) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }

    fn is_consistent(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

// ============================================================================
// Plans
// ============================================================================

/// Whether a plan requires payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// No payment; subscriptions never expire.
    Free,
    /// Requires a verified payment per billing cycle.
    Paid,
}

/// A subscription plan in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    /// Plan identifier.
    pub id: PlanId,

    /// Display name (e.g. "Pro Plan").
    pub plan_name: String,

    /// Free or paid.
    pub tier: PlanTier,

    /// Prices for individual partners.
    #[serde(default)]
    pub individual: PricingTable,

    /// Prices for organizations.
    #[serde(default)]
    pub organization: PricingTable,

    /// Unlocked features.
    #[serde(default)]
    pub features: PlanFeatures,

    /// Sessions per month allowed by the plan.
    #[serde(default)]
    pub session_limits: CountBounds,

    /// Therapist counts an organization must fall within to pick this plan.
    #[serde(default)]
    pub therapist_limits: CountBounds,

    /// Inactive plans are hidden from selection but keep existing subscribers.
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// When the plan was created.
    pub created_at: DateTime<Utc>,

    /// When the plan was last updated.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl SubscriptionPlan {
    /// Create an active plan with no prices enabled.
    #[must_use]
    pub fn new(plan_name: impl Into<String>, tier: PlanTier) -> Self {
        let now = Utc::now();
        Self {
            id: PlanId::generate(),
            plan_name: plan_name.into(),
            tier,
            individual: PricingTable::default(),
            organization: PricingTable::default(),
            features: PlanFeatures::default(),
            session_limits: CountBounds::default(),
            therapist_limits: CountBounds::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the pricing entry for one (user type, period) pair.
    #[must_use]
    pub fn with_price(
        mut self,
        user_type: UserType,
        period: BillingPeriod,
        price: PeriodPricing,
    ) -> Self {
        let table = match user_type {
            UserType::Individual => &mut self.individual,
            UserType::Organization => &mut self.organization,
        };
        match period {
            BillingPeriod::Monthly => table.monthly = price,
            BillingPeriod::Quarterly => table.quarterly = price,
            BillingPeriod::Yearly => table.yearly = price,
        }
        self
    }

    /// Pricing table for a user type.
    #[must_use]
    pub const fn pricing(&self, user_type: UserType) -> &PricingTable {
        match user_type {
            UserType::Individual => &self.individual,
            UserType::Organization => &self.organization,
        }
    }

    /// Per-month price for a (period, user type), if set.
    #[must_use]
    pub fn price(&self, period: BillingPeriod, user_type: UserType) -> Option<i64> {
        self.pricing(user_type).get(period).price_paise
    }

    /// Whether the period is offered to the user type.
    #[must_use]
    pub fn is_period_enabled(&self, period: BillingPeriod, user_type: UserType) -> bool {
        self.pricing(user_type).get(period).enabled
    }

    /// Whether the plan can currently be selected by `user_type`.
    #[must_use]
    pub fn is_offered_to(&self, user_type: UserType) -> bool {
        self.is_active && self.pricing(user_type).any_enabled()
    }

    /// Whether an organization with `therapist_count` therapists may select this plan.
    #[must_use]
    pub fn is_eligible_for_organization(&self, therapist_count: u32) -> bool {
        self.is_offered_to(UserType::Organization) && self.therapist_limits.contains(therapist_count)
    }

    /// Check catalog consistency before the plan is stored.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidPlan` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.plan_name.trim().is_empty() {
            return Err(BillingError::InvalidPlan("plan name is empty".into()));
        }
        if !self.session_limits.is_consistent() || !self.therapist_limits.is_consistent() {
            return Err(BillingError::InvalidPlan("count bounds have min > max".into()));
        }

        for user_type in [UserType::Individual, UserType::Organization] {
            for period in BillingPeriod::ALL {
                let entry = self.pricing(user_type).get(period);
                let price = entry.price_paise.unwrap_or(0);
                if price < 0 {
                    return Err(BillingError::InvalidPlan(format!(
                        "{user_type} {period} price is negative"
                    )));
                }
                match self.tier {
                    PlanTier::Free if price != 0 => {
                        return Err(BillingError::InvalidPlan(format!(
                            "free plan has a {user_type} {period} price"
                        )));
                    }
                    PlanTier::Paid if entry.enabled && price == 0 => {
                        return Err(BillingError::InvalidPlan(format!(
                            "{user_type} {period} is enabled without a price"
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}
