//! Plan purchase state machine.
//!
//! One `PurchaseFlow` tracks a single purchase attempt:
//!
//! ```text
//! Idle ──select──▶ Selecting ──free_plan_applied──────────────────────────▶ Confirmed
//!                      │
//!                      └─order_created─▶ AwaitingCheckout ─checkout_completed─▶ Verifying ─verified─▶ Confirmed
//!                                             │                                   │
//!                                             └─checkout_dismissed─▶ CancelledByUser
//!                                                                                 └─verification_failed─▶ VerificationFailed
//! ```
//!
//! `CancelledByUser` and `Failed` allow a new selection. `VerificationFailed`
//! does not: the gateway may have charged the user and the attempt needs manual
//! reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};
use crate::plan::{BillingPeriod, PlanTier, SubscriptionPlan, UserType};
use crate::subscription::{Subscription, SubscriptionStatus};
use crate::valuation::calculate_plan_value;
use crate::PlanId;

/// How a selected plan gets applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum PurchasePath {
    /// Applied directly, no payment.
    Free,
    /// Requires a gateway order for `amount_paise`.
    Paid {
        /// Amount to charge in paise.
        amount_paise: i64,
    },
}

/// State of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PurchaseState {
    /// Nothing selected.
    Idle,
    /// A plan and period were chosen.
    Selecting {
        /// Selected plan.
        plan_id: PlanId,
        /// Selected period.
        period: BillingPeriod,
        /// Free or paid.
        path: PurchasePath,
    },
    /// Gateway order exists; waiting for the checkout to finish.
    AwaitingCheckout {
        /// Selected plan.
        plan_id: PlanId,
        /// Selected period.
        period: BillingPeriod,
        /// Gateway order.
        order_id: String,
    },
    /// Checkout succeeded; waiting for the backend to verify the payment.
    Verifying {
        /// Selected plan.
        plan_id: PlanId,
        /// Selected period.
        period: BillingPeriod,
        /// Gateway order.
        order_id: String,
        /// Gateway payment.
        payment_id: String,
    },
    /// The new subscription is in place.
    Confirmed {
        /// Subscribed plan.
        plan_id: PlanId,
        /// Subscribed period.
        period: BillingPeriod,
    },
    /// The user closed the checkout. Nothing was charged.
    CancelledByUser {
        /// Abandoned gateway order.
        order_id: String,
    },
    /// The gateway reported a payment the backend could not verify.
    VerificationFailed {
        /// Gateway order.
        order_id: String,
        /// Gateway payment that may have been captured.
        payment_id: String,
    },
    /// The attempt failed before any charge.
    Failed {
        /// What went wrong.
        reason: String,
    },
}

/// A single purchase attempt.
#[derive(Debug, Clone)]
pub struct PurchaseFlow {
    state: PurchaseState,
    user_type: UserType,
    current: Option<(PlanId, BillingPeriod)>,
}

impl PurchaseFlow {
    /// Start a flow for an owner currently on `current` (if any).
    #[must_use]
    pub const fn new(user_type: UserType, current: Option<(PlanId, BillingPeriod)>) -> Self {
        Self {
            state: PurchaseState::Idle,
            user_type,
            current,
        }
    }

    /// Start a flow for an owner's stored subscription. Only an active
    /// subscription counts as current; a cancelled or expired plan may be
    /// bought again.
    #[must_use]
    pub fn for_subscription(
        user_type: UserType,
        subscription: Option<&Subscription>,
        now: DateTime<Utc>,
    ) -> Self {
        let current = subscription
            .filter(|sub| sub.status_at(now) == SubscriptionStatus::Active)
            .map(|sub| (sub.plan_id, sub.billing_period));
        Self::new(user_type, current)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &PurchaseState {
        &self.state
    }

    /// Whether `plan`/`period` is what the owner already has. The picker
    /// disables that choice.
    #[must_use]
    pub fn is_current(&self, plan_id: PlanId, period: BillingPeriod) -> bool {
        self.current == Some((plan_id, period))
    }

    /// Choose a plan and period.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless idle, cancelled by the user, or failed.
    /// - `SameAsCurrent` if the choice equals the current subscription.
    /// - `PeriodNotAvailable` if the plan does not offer the period.
    pub fn select(&mut self, plan: &SubscriptionPlan, period: BillingPeriod) -> Result<PurchasePath> {
        if !matches!(
            self.state,
            PurchaseState::Idle | PurchaseState::CancelledByUser { .. } | PurchaseState::Failed { .. }
        ) {
            return Err(self.reject("select"));
        }
        if self.is_current(plan.id, period) {
            return Err(BillingError::SameAsCurrent {
                plan_name: plan.plan_name.clone(),
                period,
            });
        }
        if !plan.is_period_enabled(period, self.user_type) {
            return Err(BillingError::PeriodNotAvailable {
                plan_name: plan.plan_name.clone(),
                period,
            });
        }

        let path = match plan.tier {
            PlanTier::Free => PurchasePath::Free,
            PlanTier::Paid => PurchasePath::Paid {
                amount_paise: calculate_plan_value(Some(plan), period, self.user_type),
            },
        };

        self.state = PurchaseState::Selecting {
            plan_id: plan.id,
            period,
            path,
        };
        Ok(path)
    }

    /// The free plan was applied by the backend.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless a free plan is selected.
    pub fn free_plan_applied(&mut self) -> Result<()> {
        match self.state {
            PurchaseState::Selecting {
                plan_id,
                period,
                path: PurchasePath::Free,
            } => {
                self.confirm(plan_id, period);
                Ok(())
            }
            _ => Err(self.reject("free_plan_applied")),
        }
    }

    /// The backend created a gateway order for the selected paid plan.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless a paid plan is selected.
    pub fn order_created(&mut self, order_id: impl Into<String>) -> Result<()> {
        match self.state {
            PurchaseState::Selecting {
                plan_id,
                period,
                path: PurchasePath::Paid { .. },
            } => {
                self.state = PurchaseState::AwaitingCheckout {
                    plan_id,
                    period,
                    order_id: order_id.into(),
                };
                Ok(())
            }
            _ => Err(self.reject("order_created")),
        }
    }

    /// The checkout returned a payment for the pending order.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless awaiting checkout for the same order.
    pub fn checkout_completed(&mut self, order_id: &str, payment_id: impl Into<String>) -> Result<()> {
        match &self.state {
            PurchaseState::AwaitingCheckout {
                plan_id,
                period,
                order_id: pending,
            } if pending == order_id => {
                self.state = PurchaseState::Verifying {
                    plan_id: *plan_id,
                    period: *period,
                    order_id: pending.clone(),
                    payment_id: payment_id.into(),
                };
                Ok(())
            }
            _ => Err(self.reject("checkout_completed")),
        }
    }

    /// The user closed the checkout.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless awaiting checkout.
    pub fn checkout_dismissed(&mut self) -> Result<()> {
        match &self.state {
            PurchaseState::AwaitingCheckout { order_id, .. } => {
                self.state = PurchaseState::CancelledByUser {
                    order_id: order_id.clone(),
                };
                Ok(())
            }
            _ => Err(self.reject("checkout_dismissed")),
        }
    }

    /// The backend verified the payment and applied the subscription.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless verifying.
    pub fn verified(&mut self) -> Result<()> {
        match self.state {
            PurchaseState::Verifying { plan_id, period, .. } => {
                self.confirm(plan_id, period);
                Ok(())
            }
            _ => Err(self.reject("verified")),
        }
    }

    /// The backend rejected the payment.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless verifying.
    pub fn verification_failed(&mut self) -> Result<()> {
        match &self.state {
            PurchaseState::Verifying {
                order_id,
                payment_id,
                ..
            } => {
                self.state = PurchaseState::VerificationFailed {
                    order_id: order_id.clone(),
                    payment_id: payment_id.clone(),
                };
                Ok(())
            }
            _ => Err(self.reject("verification_failed")),
        }
    }

    /// The attempt failed before any charge (order creation, checkout load,
    /// free-plan call).
    ///
    /// # Errors
    ///
    /// `InvalidTransition` once a payment exists or the flow is confirmed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        match self.state {
            PurchaseState::Selecting { .. } | PurchaseState::AwaitingCheckout { .. } => {
                self.state = PurchaseState::Failed {
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(self.reject("fail")),
        }
    }

    fn confirm(&mut self, plan_id: PlanId, period: BillingPeriod) {
        self.state = PurchaseState::Confirmed { plan_id, period };
        self.current = Some((plan_id, period));
    }

    fn reject(&self, event: &'static str) -> BillingError {
        BillingError::InvalidTransition {
            from: self.state.clone(),
            event,
        }
    }
}
