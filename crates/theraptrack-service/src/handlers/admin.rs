//! Platform administration handlers.
//!
//! All routes here require the `X-Admin-Key` header.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use theraptrack_core::{
    BillingPeriod, CountBounds, Organization, OrganizationId, Partner, PlanFeatures, PlanId,
    PlanTier, PricingTable, Subscription, SubscriptionOwner, SubscriptionPlan, UserType,
};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::subscriptions::{describe, load_active_plan, SubscriptionResponse};
use crate::state::AppState;

/// Create or replace a catalog plan.
#[derive(Debug, Deserialize)]
pub struct UpsertPlanRequest {
    /// Existing plan to replace. A new ID is generated when absent.
    pub id: Option<PlanId>,
    /// Display name.
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
    /// Sessions per month.
    #[serde(default)]
    pub session_limits: CountBounds,
    /// Therapist count bounds for organizations.
    #[serde(default)]
    pub therapist_limits: CountBounds,
    /// Whether the plan can be selected.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Create an organization.
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    /// Display name.
    pub name: String,
    /// Whether the platform manages this organization's billing.
    #[serde(default)]
    pub theraptrack_controlled: bool,
}

/// Create a partner.
#[derive(Debug, Deserialize)]
pub struct CreatePartnerRequest {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    #[serde(default)]
    pub contact: Option<String>,
    /// Organization to join. Independent when absent.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
}

/// Set an organization's plan directly.
#[derive(Debug, Deserialize)]
pub struct SetOrganizationPlanRequest {
    /// Plan to assign.
    pub plan_id: PlanId,
    /// Billing period.
    pub billing_period: BillingPeriod,
}

/// Create or replace a plan.
pub async fn upsert_plan(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<UpsertPlanRequest>,
) -> Result<Json<SubscriptionPlan>, ApiError> {
    let now = Utc::now();
    let existing = match body.id {
        Some(id) => state.store.get_plan(&id)?,
        None => None,
    };

    let plan = SubscriptionPlan {
        id: body.id.unwrap_or_else(PlanId::generate),
        plan_name: body.plan_name,
        tier: body.tier,
        individual: body.individual,
        organization: body.organization,
        features: body.features,
        session_limits: body.session_limits,
        therapist_limits: body.therapist_limits,
        is_active: body.is_active,
        created_at: existing.as_ref().map_or(now, |plan| plan.created_at),
        updated_at: now,
    };
    plan.validate()?;
    state.store.put_plan(&plan)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        plan_id = %plan.id,
        plan = %plan.plan_name,
        created = existing.is_none(),
        "Plan saved"
    );

    Ok(Json(plan))
}

/// Create an organization.
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("organization name is required".into()));
    }

    let organization = Organization::new(body.name.trim(), body.theraptrack_controlled);
    state.store.put_organization(&organization)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        organization_id = %organization.id,
        theraptrack_controlled = organization.theraptrack_controlled,
        "Organization created"
    );

    Ok((StatusCode::CREATED, Json(organization)))
}

/// Create a partner, optionally inside an organization.
pub async fn create_partner(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<CreatePartnerRequest>,
) -> Result<(StatusCode, Json<Partner>), ApiError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::BadRequest("partner name and email are required".into()));
    }
    if let Some(organization_id) = &body.organization_id {
        if state.store.get_organization(organization_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "organization not found: {organization_id}"
            )));
        }
    }

    let mut partner = Partner::new(body.name.trim(), body.email.trim(), body.organization_id);
    partner.contact = body.contact;
    state.store.put_partner(&partner)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        partner_id = %partner.id,
        organization_id = ?partner.organization_id,
        "Partner created"
    );

    Ok((StatusCode::CREATED, Json(partner)))
}

/// Assign a plan to an organization without payment.
///
/// Used for organizations whose billing TheraPTrack controls.
pub async fn set_organization_subscription(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(organization_id): Path<OrganizationId>,
    Json(body): Json<SetOrganizationPlanRequest>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let owner = SubscriptionOwner::Organization(organization_id);
    let plan = load_active_plan(&state, &body.plan_id)?;
    if !plan.is_period_enabled(body.billing_period, UserType::Organization) {
        return Err(ApiError::BadRequest(format!(
            "plan {} is not offered {} to organizations",
            plan.plan_name, body.billing_period
        )));
    }

    let now = Utc::now();
    let subscription = Subscription::start(&plan, body.billing_period, now)?;
    let previous = state
        .store
        .replace_subscription(&owner, subscription.clone())?;

    tracing::info!(
        admin_id = %admin.admin_id,
        organization_id = %organization_id,
        plan = %plan.plan_name,
        period = %body.billing_period,
        previous_plan = ?previous.map(|sub| sub.plan_name),
        "Organization plan set by admin"
    );

    describe(&state, owner, Some(subscription), now).map(Json)
}
