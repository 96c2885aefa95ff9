//! Subscription handlers for organizations and partners.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use theraptrack_core::{
    can_cancel_subscription, has_upgradeable_plans, plan_selection_action, subscription_status,
    BillingError, BillingPeriod, CancellationNotice, OrganizationId, PartnerId, PlanId, PlanSelectionAction,
    PurchaseFlow, PurchasePath, Subscription, SubscriptionOwner, SubscriptionPlan,
    SubscriptionStatus, UserType,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::plans::offered_plans;
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Plan and billing period chosen by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectPlanRequest {
    /// Plan to subscribe to.
    pub plan_id: PlanId,
    /// Billing period.
    pub billing_period: BillingPeriod,
}

/// An owner's subscription with the derived plan-picker state.
#[derive(Debug, Serialize)]
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
    /// Button label for `selection_action`.
    pub selection_label: Option<&'static str>,
}

/// Result of a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Confirmation data.
    #[serde(flatten)]
    pub notice: CancellationNotice,
    /// Confirmation message.
    pub message: String,
}

impl From<CancellationNotice> for CancelResponse {
    fn from(notice: CancellationNotice) -> Self {
        let message = format!(
            "Your {} subscription has been cancelled. You will keep access until {} ({} days).",
            notice.plan_name,
            notice.access_until.format("%d %b %Y"),
            notice.remaining_days
        );
        Self { notice, message }
    }
}

/// Result of a bulk partner assignment.
#[derive(Debug, Serialize)]
pub struct AssignPartnersResponse {
    /// Number of partners updated.
    pub assigned: usize,
    /// Subscription given to each partner.
    pub subscription: Subscription,
}

// ============================================================================
// Shared Logic
// ============================================================================

/// Number of therapists in an organization, used for plan eligibility.
pub(crate) fn therapist_count(
    state: &AppState,
    organization_id: &OrganizationId,
) -> Result<u32, ApiError> {
    let count = state
        .store
        .list_partners_by_organization(organization_id)?
        .len();
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Reject owners whose billing is not managed by themselves: organizations
/// controlled by TheraPTrack and partners that belong to an organization.
pub(crate) fn ensure_self_managed(
    state: &AppState,
    owner: &SubscriptionOwner,
) -> Result<(), ApiError> {
    let managed_elsewhere = match owner {
        SubscriptionOwner::Organization(id) => {
            state
                .store
                .get_organization(id)?
                .ok_or_else(|| ApiError::NotFound(format!("organization not found: {id}")))?
                .theraptrack_controlled
        }
        SubscriptionOwner::Partner(id) => !state
            .store
            .get_partner(id)?
            .ok_or_else(|| ApiError::NotFound(format!("partner not found: {id}")))?
            .is_independent(),
    };

    if managed_elsewhere {
        tracing::info!(owner = %owner, "Subscription change refused: billing is managed elsewhere");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Load an active plan by ID.
pub(crate) fn load_active_plan(
    state: &AppState,
    plan_id: &PlanId,
) -> Result<SubscriptionPlan, ApiError> {
    let plan = state
        .store
        .get_plan(plan_id)?
        .ok_or_else(|| BillingError::PlanNotFound {
            plan_id: plan_id.to_string(),
        })?;

    if !plan.is_active {
        return Err(ApiError::BadRequest(format!(
            "plan {} is no longer offered",
            plan.plan_name
        )));
    }
    Ok(plan)
}

/// Reject plans whose therapist limits do not cover an organization's
/// current team size. Partners have no limits.
pub(crate) fn ensure_eligible(
    state: &AppState,
    owner: &SubscriptionOwner,
    plan: &SubscriptionPlan,
) -> Result<(), ApiError> {
    let SubscriptionOwner::Organization(id) = owner else {
        return Ok(());
    };
    let count = therapist_count(state, id)?;
    if !plan.therapist_limits.contains(count) {
        tracing::info!(
            owner = %owner,
            plan = %plan.plan_name,
            therapist_count = count,
            "Plan refused: therapist count outside plan limits"
        );
        return Err(ApiError::BadRequest(format!(
            "plan {} does not cover {count} therapists",
            plan.plan_name
        )));
    }
    Ok(())
}

/// Build the response for an owner's subscription at `now`.
pub(crate) fn describe(
    state: &AppState,
    owner: SubscriptionOwner,
    subscription: Option<Subscription>,
    now: DateTime<Utc>,
) -> Result<SubscriptionResponse, ApiError> {
    let user_type = owner.user_type();
    let therapist_count = match owner {
        SubscriptionOwner::Organization(id) => Some(therapist_count(state, &id)?),
        SubscriptionOwner::Partner(_) => None,
    };
    let plans = offered_plans(state, user_type, therapist_count)?;

    let plan = match &subscription {
        Some(sub) => state.store.get_plan(&sub.plan_id)?,
        None => None,
    };
    let period = subscription.as_ref().map(|sub| sub.billing_period);
    let action = plan_selection_action(plan.as_ref(), period, &plans, user_type);

    Ok(SubscriptionResponse {
        owner,
        status: subscription_status(subscription.as_ref(), now),
        can_cancel: can_cancel_subscription(subscription.as_ref(), now),
        has_upgradeable_plans: has_upgradeable_plans(plan.as_ref(), period, &plans, user_type),
        selection_action: action,
        selection_label: action.map(PlanSelectionAction::label),
        subscription,
        plan,
    })
}

fn get_subscription(
    state: &AppState,
    owner: SubscriptionOwner,
) -> Result<SubscriptionResponse, ApiError> {
    let subscription = state.store.get_subscription(&owner)?;
    describe(state, owner, subscription, Utc::now())
}

/// Apply a free plan. Paid plans are rejected with `PaymentRequired`.
fn select_subscription(
    state: &AppState,
    owner: SubscriptionOwner,
    request: &SelectPlanRequest,
) -> Result<SubscriptionResponse, ApiError> {
    ensure_self_managed(state, &owner)?;

    let now = Utc::now();
    let current = state.store.get_subscription(&owner)?;
    let plan = load_active_plan(state, &request.plan_id)?;

    let mut flow = PurchaseFlow::for_subscription(owner.user_type(), current.as_ref(), now);
    match flow.select(&plan, request.billing_period)? {
        PurchasePath::Free => {}
        PurchasePath::Paid { amount_paise } => {
            tracing::debug!(
                owner = %owner,
                plan = %plan.plan_name,
                amount_paise,
                "Paid plan selected without payment"
            );
            return Err(BillingError::PaymentRequired {
                plan_name: plan.plan_name,
            }
            .into());
        }
    }
    ensure_eligible(state, &owner, &plan)?;

    let subscription = Subscription::start(&plan, request.billing_period, now)?;
    let previous = state
        .store
        .replace_subscription(&owner, subscription.clone())?;
    flow.free_plan_applied()?;

    tracing::info!(
        owner = %owner,
        plan = %plan.plan_name,
        period = %request.billing_period,
        previous_plan = ?previous.map(|sub| sub.plan_name),
        "Free plan applied"
    );

    describe(state, owner, Some(subscription), now)
}

fn cancel_subscription(
    state: &AppState,
    owner: SubscriptionOwner,
) -> Result<CancelResponse, ApiError> {
    ensure_self_managed(state, &owner)?;

    let notice = state
        .store
        .cancel_subscription(&owner, Utc::now())
        .map_err(|err| {
            tracing::debug!(owner = %owner, error = %err, "Cancellation refused");
            ApiError::from(err)
        })?;

    tracing::info!(
        owner = %owner,
        plan = %notice.plan_name,
        access_until = %notice.access_until,
        "Subscription cancelled"
    );

    Ok(notice.into())
}

// ============================================================================
// Organization Handlers
// ============================================================================

/// Get an organization's subscription.
pub async fn get_organization_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(organization_id): Path<OrganizationId>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    user.require_organization_admin(organization_id)?;
    get_subscription(&state, SubscriptionOwner::Organization(organization_id)).map(Json)
}

/// Select a free plan for an organization.
pub async fn select_organization_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(organization_id): Path<OrganizationId>,
    Json(request): Json<SelectPlanRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    user.require_organization_admin(organization_id)?;
    select_subscription(
        &state,
        SubscriptionOwner::Organization(organization_id),
        &request,
    )
    .map(Json)
}

/// Cancel an organization's subscription at the end of its period.
pub async fn cancel_organization_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(organization_id): Path<OrganizationId>,
) -> Result<Json<CancelResponse>, ApiError> {
    user.require_organization_admin(organization_id)?;
    cancel_subscription(&state, SubscriptionOwner::Organization(organization_id)).map(Json)
}

/// Give every partner of an organization the same plan, without payment.
pub async fn assign_partner_subscriptions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(organization_id): Path<OrganizationId>,
    Json(request): Json<SelectPlanRequest>,
) -> Result<Json<AssignPartnersResponse>, ApiError> {
    user.require_organization_admin(organization_id)?;

    let plan = load_active_plan(&state, &request.plan_id)?;
    if !plan.is_period_enabled(request.billing_period, UserType::Individual) {
        return Err(ApiError::BadRequest(format!(
            "plan {} is not offered {} to partners",
            plan.plan_name, request.billing_period
        )));
    }

    let subscription = Subscription::start(&plan, request.billing_period, Utc::now())?;
    let assigned = state
        .store
        .assign_partner_subscriptions(&organization_id, &subscription)?;

    tracing::info!(
        organization_id = %organization_id,
        plan = %plan.plan_name,
        period = %request.billing_period,
        assigned,
        "Assigned plan to all partners"
    );

    Ok(Json(AssignPartnersResponse {
        assigned,
        subscription,
    }))
}

// ============================================================================
// Partner Handlers
// ============================================================================

/// Get a partner's subscription.
pub async fn get_partner_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(partner_id): Path<PartnerId>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    user.require_partner(partner_id)?;
    get_subscription(&state, SubscriptionOwner::Partner(partner_id)).map(Json)
}

/// Select a free plan for an independent partner.
pub async fn select_partner_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(partner_id): Path<PartnerId>,
    Json(request): Json<SelectPlanRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    user.require_partner(partner_id)?;
    select_subscription(&state, SubscriptionOwner::Partner(partner_id), &request).map(Json)
}

/// Cancel an independent partner's subscription.
pub async fn cancel_partner_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(partner_id): Path<PartnerId>,
) -> Result<Json<CancelResponse>, ApiError> {
    user.require_partner(partner_id)?;
    cancel_subscription(&state, SubscriptionOwner::Partner(partner_id)).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cancel_message_names_plan_and_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let response = CancelResponse::from(CancellationNotice::new("Pro Plan", until, now));

        assert_eq!(response.notice.remaining_days, 30);
        assert_eq!(
            response.message,
            "Your Pro Plan subscription has been cancelled. You will keep access until 31 Jan 2026 (30 days)."
        );
    }
}
