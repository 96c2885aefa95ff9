//! Request and response types for the billing client.

use serde::{Deserialize, Serialize};

use theraptrack_core::{
    BillingPeriod, CancellationNotice, PaymentStatus, PlanId, PlanSelectionAction, PlanTier,
    ReceiptId, Subscription, SubscriptionOwner, SubscriptionPlan, SubscriptionStatus, UserType,
};

// ============================================================================
// Plans
// ============================================================================

/// Plan catalog for one user type.
#[derive(Debug, Clone, Deserialize)]
pub struct PlansResponse {
    /// Which price column applies.
    pub user_type: UserType,
    /// Selectable plans.
    pub plans: Vec<SubscriptionPlan>,
    /// Plans grouped by enabled billing period.
    pub periods: Vec<PeriodOffers>,
}

/// Plans offered for one billing period.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodOffers {
    /// Billing period.
    pub period: BillingPeriod,
    /// Offers in catalog order.
    pub offers: Vec<PlanOffer>,
}

/// A plan priced for one billing period.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanOffer {
    /// Plan ID.
    pub plan_id: PlanId,
    /// Plan name.
    pub plan_name: String,
    /// Free or paid.
    pub tier: PlanTier,
    /// Per-month price in paise.
    pub monthly_rate_paise: i64,
    /// Amount charged for the period in paise.
    pub total_paise: i64,
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Plan and billing period to subscribe to.
#[derive(Debug, Clone, Serialize)]
pub struct SelectPlanRequest {
    /// Plan ID.
    pub plan_id: PlanId,
    /// Billing period.
    pub billing_period: BillingPeriod,
}

/// An owner's subscription and plan-picker state.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    /// Who the subscription belongs to.
    pub owner: SubscriptionOwner,
    /// Derived status.
    pub status: SubscriptionStatus,
    /// Stored subscription, if any.
    pub subscription: Option<Subscription>,
    /// Catalog entry of the current plan.
    pub plan: Option<SubscriptionPlan>,
    /// Whether the subscription can be cancelled now.
    pub can_cancel: bool,
    /// Whether a more valuable plan is available.
    pub has_upgradeable_plans: bool,
    /// Plan-picker action to offer.
    pub selection_action: Option<PlanSelectionAction>,
    /// Button label.
    pub selection_label: Option<String>,
}

/// Cancellation confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelResponse {
    /// Plan, access-until date and remaining days.
    #[serde(flatten)]
    pub notice: CancellationNotice,
    /// Confirmation message.
    pub message: String,
}

/// Result of assigning a plan to every partner of an organization.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignPartnersResponse {
    /// Number of partners updated.
    pub assigned: usize,
    /// Subscription given to each partner.
    pub subscription: Subscription,
}

// ============================================================================
// Payments
// ============================================================================

/// Request to create a gateway order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Who is buying.
    pub owner: SubscriptionOwner,
    /// Plan ID.
    pub plan_id: PlanId,
    /// Billing period.
    pub billing_period: BillingPeriod,
}

/// Gateway order ready for checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentOrder {
    /// Gateway order ID.
    pub order_id: String,
    /// Public gateway key for the checkout.
    pub key_id: String,
    /// Amount in paise.
    pub amount_paise: i64,
    /// ISO currency.
    pub currency: String,
    /// Receipt reference.
    pub receipt: ReceiptId,
    /// Plan ID.
    pub plan_id: PlanId,
    /// Plan name.
    pub plan_name: String,
    /// Billing period.
    pub billing_period: BillingPeriod,
}

/// Result of payment verification.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentResponse {
    /// Gateway order ID.
    pub order_id: String,
    /// Gateway payment ID.
    pub payment_id: String,
    /// Transaction status.
    pub status: PaymentStatus,
    /// Whether an earlier call or webhook had already verified the order.
    pub already_verified: bool,
    /// The owner's subscription after verification.
    pub subscription: Option<Subscription>,
}

// ============================================================================
// Errors
// ============================================================================

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
