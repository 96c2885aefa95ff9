//! Error types for TheraPTrack billing.

use crate::ids::IdError;
use crate::plan::BillingPeriod;
use crate::purchase::PurchaseState;
use crate::subscription::SubscriptionStatus;

/// Result type for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in billing operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Plan not found in the catalog.
    #[error("plan not found: {plan_id}")]
    PlanNotFound {
        /// The plan ID that was not found.
        plan_id: String,
    },

    /// Plan definition is inconsistent.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Unknown billing period name.
    #[error("invalid billing period: {0}")]
    InvalidBillingPeriod(String),

    /// The plan does not offer this billing period to this user type.
    #[error("billing period {period} is not available for plan {plan_name}")]
    PeriodNotAvailable {
        /// The plan name.
        plan_name: String,
        /// The requested period.
        period: BillingPeriod,
    },

    /// The selection equals the owner's current plan and period.
    #[error("already subscribed to {plan_name} ({period})")]
    SameAsCurrent {
        /// The plan name.
        plan_name: String,
        /// The current period.
        period: BillingPeriod,
    },

    /// The plan requires a verified payment.
    #[error("plan {plan_name} requires payment")]
    PaymentRequired {
        /// The plan name.
        plan_name: String,
    },

    /// The order was already paid by a different payment.
    #[error("order {order_id} was already verified with another payment")]
    PaymentConflict {
        /// The gateway order ID.
        order_id: String,
    },

    /// Subscription cannot be cancelled in its current status.
    #[error("subscription cannot be cancelled while {status}")]
    NotCancellable {
        /// Current derived status.
        status: SubscriptionStatus,
    },

    /// Subscription has no end date, so there is nothing to cancel.
    #[error("subscription has no end date")]
    NoEndDate,

    /// Date arithmetic left the representable range.
    #[error("date out of range")]
    DateOutOfRange,

    /// Invalid purchase flow transition.
    #[error("invalid purchase transition from {from:?} on {event}")]
    InvalidTransition {
        /// The state the flow was in.
        from: PurchaseState,
        /// The event that was rejected.
        event: &'static str,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
