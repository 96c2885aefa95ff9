//! Plan valuation, upgrade detection and subscription predicates.
//!
//! Every function here is total: missing plans, prices or subscriptions degrade
//! to `0`, `false` or [`SubscriptionStatus::None`] instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{BillingPeriod, PlanTier, SubscriptionPlan, UserType};
use crate::subscription::{Subscription, SubscriptionStatus};

/// Value of a plan for comparison: per-month price times the number of months
/// in the billing period. Zero when the plan or the price is missing.
#[must_use]
pub fn calculate_plan_value(
    plan: Option<&SubscriptionPlan>,
    period: BillingPeriod,
    user_type: UserType,
) -> i64 {
    plan.and_then(|p| p.price(period, user_type))
        .map_or(0, |price| price.saturating_mul(period.multiplier()))
}

/// Whether moving from the current plan/period to the new one strictly
/// increases the plan value.
#[must_use]
pub fn is_upgrade(
    current_plan: Option<&SubscriptionPlan>,
    current_period: BillingPeriod,
    new_plan: Option<&SubscriptionPlan>,
    new_period: BillingPeriod,
    user_type: UserType,
) -> bool {
    calculate_plan_value(new_plan, new_period, user_type)
        > calculate_plan_value(current_plan, current_period, user_type)
}

/// Whether the plan is the free tier.
#[must_use]
pub fn is_free_plan(plan: Option<&SubscriptionPlan>) -> bool {
    plan.is_some_and(|p| p.tier == PlanTier::Free)
}

/// Derived status of an optional subscription at `now`.
#[must_use]
pub fn subscription_status(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
) -> SubscriptionStatus {
    subscription.map_or(SubscriptionStatus::None, |s| s.status_at(now))
}

/// Whether the subscription exists and is active at `now`.
#[must_use]
pub fn is_subscription_active(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    subscription.is_some_and(|s| s.is_active_at(now))
}

/// Whether the subscription exists, has an end date and is active at `now`.
#[must_use]
pub fn can_cancel_subscription(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    subscription.is_some_and(|s| s.can_cancel_at(now))
}

/// Billing periods the plan offers to `user_type`, in display order.
#[must_use]
pub fn available_periods(plan: &SubscriptionPlan, user_type: UserType) -> Vec<BillingPeriod> {
    BillingPeriod::ALL
        .into_iter()
        .filter(|period| plan.is_period_enabled(*period, user_type))
        .collect()
}

/// One billing-period tab of the plan picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTab<'a> {
    /// The billing period of this tab.
    pub period: BillingPeriod,
    /// Plans offering this period.
    pub plans: Vec<&'a SubscriptionPlan>,
}

/// Group selectable plans by the billing periods they offer. Empty tabs are
/// omitted.
#[must_use]
pub fn group_by_period(plans: &[SubscriptionPlan], user_type: UserType) -> Vec<PeriodTab<'_>> {
    BillingPeriod::ALL
        .into_iter()
        .filter_map(|period| {
            let plans: Vec<_> = plans
                .iter()
                .filter(|p| p.is_active && p.is_period_enabled(period, user_type))
                .collect();
            (!plans.is_empty()).then_some(PeriodTab { period, plans })
        })
        .collect()
}

/// Whether any (plan, period) pair is worth more than the current one.
///
/// Every billing period with a price is compared, including periods the
/// picker does not show. Without a current plan, any offered plan counts.
#[must_use]
pub fn has_upgradeable_plans(
    current_plan: Option<&SubscriptionPlan>,
    current_period: Option<BillingPeriod>,
    plans: &[SubscriptionPlan],
    user_type: UserType,
) -> bool {
    let Some(current) = current_plan else {
        return plans.iter().any(|p| p.is_offered_to(user_type));
    };

    let current_value = calculate_plan_value(
        Some(current),
        current_period.unwrap_or(BillingPeriod::Monthly),
        user_type,
    );

    plans.iter().any(|plan| {
        BillingPeriod::ALL
            .into_iter()
            .any(|period| calculate_plan_value(Some(plan), period, user_type) > current_value)
    })
}

/// The plan-picker action to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSelectionAction {
    /// No plan yet.
    Select,
    /// A more valuable plan is available.
    Upgrade,
}

impl PlanSelectionAction {
    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "Select Plan",
            Self::Upgrade => "Upgrade Plan",
        }
    }
}

/// Which plan-picker action, if any, to expose for the current plan.
#[must_use]
pub fn plan_selection_action(
    current_plan: Option<&SubscriptionPlan>,
    current_period: Option<BillingPeriod>,
    plans: &[SubscriptionPlan],
    user_type: UserType,
) -> Option<PlanSelectionAction> {
    if current_plan.is_none() {
        return Some(PlanSelectionAction::Select);
    }
    has_upgradeable_plans(current_plan, current_period, plans, user_type)
        .then_some(PlanSelectionAction::Upgrade)
}
