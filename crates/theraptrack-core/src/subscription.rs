//! Subscriptions and their derived status.
//!
//! A subscription never stores its status. Status is computed from the
//! cancellation flag and the end date relative to "now":
//!
//! | `is_cancelled` | end date          | status      |
//! |----------------|-------------------|-------------|
//! | false          | none or future    | `Active`    |
//! | true           | future            | `Cancelled` |
//! | any            | past (or none, cancelled) | `Expired` |

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};
use crate::plan::{BillingPeriod, PlanTier, SubscriptionPlan, UserType};
use crate::{OrganizationId, PartnerId, PlanId};

/// The tenant a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SubscriptionOwner {
    /// An organization subscription.
    Organization(OrganizationId),
    /// An individual partner subscription.
    Partner(PartnerId),
}

impl SubscriptionOwner {
    /// Which price column applies to this owner.
    #[must_use]
    pub const fn user_type(&self) -> UserType {
        match self {
            Self::Organization(_) => UserType::Organization,
            Self::Partner(_) => UserType::Individual,
        }
    }
}

impl fmt::Display for SubscriptionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization(id) => write!(f, "organization:{id}"),
            Self::Partner(id) => write!(f, "partner:{id}"),
        }
    }
}

/// Derived status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Not cancelled and not past its end date.
    Active,
    /// Cancelled but still inside the grace period.
    Cancelled,
    /// Past its end date.
    Expired,
    /// No subscription at all.
    None,
}

impl SubscriptionStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::None => "none",
        }
    }

    /// Whether the owner keeps full access. Cancelled subscriptions keep access
    /// until their end date.
    #[must_use]
    pub const fn has_access(self) -> bool {
        matches!(self, Self::Active | Self::Cancelled)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plan assignment for an organization or partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// The subscribed plan.
    pub plan_id: PlanId,

    /// Plan name at the time of subscribing.
    pub plan_name: String,

    /// Billing period.
    pub billing_period: BillingPeriod,

    /// When the subscription started.
    pub subscription_start_date: DateTime<Utc>,

    /// When access ends. `None` for subscriptions that never expire.
    pub subscription_end_date: Option<DateTime<Utc>>,

    /// Whether the owner cancelled.
    #[serde(default)]
    pub is_cancelled: bool,

    /// When the owner cancelled.
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Gateway order that paid for this subscription.
    #[serde(default)]
    pub order_id: Option<String>,

    /// Gateway payment that paid for this subscription.
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl Subscription {
    /// Start a subscription to `plan` at `now`.
    ///
    /// Paid plans end after one billing cycle; free plans never end.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::DateOutOfRange` if the end date overflows.
    pub fn start(plan: &SubscriptionPlan, period: BillingPeriod, now: DateTime<Utc>) -> Result<Self> {
        let subscription_end_date = match plan.tier {
            PlanTier::Free => None,
            PlanTier::Paid => Some(
                now.checked_add_months(Months::new(period.months()))
                    .ok_or(BillingError::DateOutOfRange)?,
            ),
        };

        Ok(Self {
            plan_id: plan.id,
            plan_name: plan.plan_name.clone(),
            billing_period: period,
            subscription_start_date: now,
            subscription_end_date,
            is_cancelled: false,
            cancelled_at: None,
            order_id: None,
            payment_id: None,
        })
    }

    /// Attach the gateway payment that paid for this subscription.
    #[must_use]
    pub fn with_payment(mut self, order_id: impl Into<String>, payment_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self.payment_id = Some(payment_id.into());
        self
    }

    /// Status at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        let in_future = self.subscription_end_date.map(|end| end > now);

        match (self.is_cancelled, in_future) {
            (false, None | Some(true)) => SubscriptionStatus::Active,
            (true, Some(true)) => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Expired,
        }
    }

    /// Whether the subscription is active (not cancelled, not expired) at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == SubscriptionStatus::Active
    }

    /// Whether the owner may cancel at `now`.
    ///
    /// Only active subscriptions with an end date can be cancelled; a
    /// subscription without an end date has no grace period to run out.
    #[must_use]
    pub fn can_cancel_at(&self, now: DateTime<Utc>) -> bool {
        self.subscription_end_date.is_some() && self.is_active_at(now)
    }

    /// Mark the subscription cancelled at `now`.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::NotCancellable` if `can_cancel_at(now)` is false.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<CancellationNotice> {
        let access_until = match self.subscription_end_date {
            Some(end) if self.is_active_at(now) => end,
            Some(_) => {
                return Err(BillingError::NotCancellable {
                    status: self.status_at(now),
                })
            }
            None => return Err(BillingError::NoEndDate),
        };

        self.is_cancelled = true;
        self.cancelled_at = Some(now);

        Ok(CancellationNotice::new(&self.plan_name, access_until, now))
    }
}

/// What the owner is told when confirming a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationNotice {
    /// Plan being cancelled.
    pub plan_name: String,
    /// Full access continues until this instant.
    pub access_until: DateTime<Utc>,
    /// Whole days of access left, rounded up.
    pub remaining_days: i64,
}

impl CancellationNotice {
    /// Build the notice for a subscription ending at `access_until`.
    #[must_use]
    pub fn new(plan_name: &str, access_until: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = access_until - now;
        let mut remaining_days = remaining.num_days();
        if remaining > chrono::Duration::days(remaining_days) {
            remaining_days += 1;
        }

        Self {
            plan_name: plan_name.to_string(),
            access_until,
            remaining_days: remaining_days.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::plan::PeriodPricing;

    fn paid_plan() -> SubscriptionPlan {
        SubscriptionPlan::new("Pro Plan", PlanTier::Paid).with_price(
            UserType::Individual,
            BillingPeriod::Quarterly,
            PeriodPricing::enabled(80_000),
        )
    }

    #[test]
    fn paid_subscription_ends_after_one_cycle() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap();
        let sub = Subscription::start(&paid_plan(), BillingPeriod::Quarterly, now).unwrap();
        assert_eq!(
            sub.subscription_end_date,
            Some(Utc.with_ymd_and_hms(2026, 4, 30, 10, 0, 0).unwrap())
        );
        assert_eq!(sub.status_at(now), SubscriptionStatus::Active);
    }

    #[test]
    fn free_subscription_never_ends() {
        let plan = SubscriptionPlan::new("Free Plan", PlanTier::Free);
        let now = Utc::now();
        let sub = Subscription::start(&plan, BillingPeriod::Monthly, now).unwrap();
        assert!(sub.subscription_end_date.is_none());
        assert_eq!(
            sub.status_at(now + Duration::days(10_000)),
            SubscriptionStatus::Active
        );
        assert!(!sub.can_cancel_at(now));
    }

    #[test]
    fn cancelled_subscription_keeps_access_until_end() {
        let now = Utc::now();
        let mut sub = Subscription::start(&paid_plan(), BillingPeriod::Quarterly, now).unwrap();
        let end = sub.subscription_end_date.unwrap();

        let notice = sub.cancel(now).unwrap();
        assert_eq!(notice.access_until, end);
        assert!(notice.remaining_days >= 89);
        assert_eq!(sub.status_at(now), SubscriptionStatus::Cancelled);
        assert!(sub.status_at(now).has_access());
        assert_eq!(sub.status_at(end), SubscriptionStatus::Expired);
        assert!(!sub.status_at(end).has_access());
    }

    #[test]
    fn cancel_twice_is_rejected() {
        let now = Utc::now();
        let mut sub = Subscription::start(&paid_plan(), BillingPeriod::Quarterly, now).unwrap();
        sub.cancel(now).unwrap();
        assert!(matches!(
            sub.cancel(now),
            Err(BillingError::NotCancellable {
                status: SubscriptionStatus::Cancelled
            })
        ));
    }

    #[test]
    fn cancelling_free_subscription_is_rejected() {
        let plan = SubscriptionPlan::new("Free Plan", PlanTier::Free);
        let mut sub = Subscription::start(&plan, BillingPeriod::Monthly, Utc::now()).unwrap();
        assert!(matches!(sub.cancel(Utc::now()), Err(BillingError::NoEndDate)));
        assert!(!sub.is_cancelled);
    }

    #[test]
    fn cancellation_notice_rounds_partial_days_up() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let notice = CancellationNotice::new("Pro Plan", now + Duration::hours(25), now);
        assert_eq!(notice.remaining_days, 2);
        let notice = CancellationNotice::new("Pro Plan", now - Duration::hours(1), now);
        assert_eq!(notice.remaining_days, 0);
    }

    #[test]
    fn owner_serializes_with_type_tag() {
        let id = PartnerId::generate();
        let json = serde_json::to_value(SubscriptionOwner::Partner(id)).unwrap();
        assert_eq!(json["type"], "partner");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(
            SubscriptionOwner::Partner(id).user_type(),
            UserType::Individual
        );
    }
}
