//! Core types and rules for TheraPTrack subscription billing.
//!
//! This crate holds the pure domain of the billing system; it performs no I/O.
//!
//! - **Identifiers**: `OrganizationId`, `PartnerId`, `PlanId`, `UserId`, `ReceiptId`
//! - **Catalog**: `SubscriptionPlan`, `BillingPeriod`, `UserType`, `PlanTier`
//! - **Subscriptions**: `Subscription`, `SubscriptionStatus` (always derived), `CancellationNotice`
//! - **Valuation**: plan value, upgrade detection, plan-picker actions
//! - **Purchases**: `PurchaseFlow` state machine and `PaymentTransaction`
//!
//! # Money
//!
//! All amounts are integer paise (₹1 = 100 paise). Plan prices are per-month
//! rates for their billing period; the amount charged for a purchase is
//! `price × months`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod payment;
pub mod plan;
pub mod purchase;
pub mod subscription;
pub mod tenant;
pub mod valuation;

pub use error::{BillingError, Result};
pub use ids::{IdError, OrganizationId, PartnerId, PlanId, ReceiptId, UserId};
pub use payment::{
    PaymentStatus, PaymentTransaction, PaymentVerification, VerifyOutcome, DEFAULT_CURRENCY,
};
pub use plan::{
    BillingPeriod, CountBounds, PeriodPricing, PlanFeatures, PlanTier, PricingTable,
    SubscriptionPlan, SupportTier, UserType,
};
pub use purchase::{PurchaseFlow, PurchasePath, PurchaseState};
pub use subscription::{CancellationNotice, Subscription, SubscriptionOwner, SubscriptionStatus};
pub use tenant::{Organization, Partner};
pub use valuation::{
    available_periods, calculate_plan_value, can_cancel_subscription, group_by_period,
    has_upgradeable_plans, is_free_plan, is_subscription_active, is_upgrade,
    plan_selection_action, subscription_status, PeriodTab, PlanSelectionAction,
};
