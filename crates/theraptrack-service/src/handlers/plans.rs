//! Plan catalog handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use theraptrack_core::{
    calculate_plan_value, group_by_period, BillingPeriod, PlanId, PlanTier, SubscriptionPlan,
    UserType,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Query for organization plans.
#[derive(Debug, Deserialize)]
pub struct OrganizationPlansQuery {
    /// Only return plans whose therapist bounds include this count.
    pub therapist_count: Option<u32>,
}

/// Plan catalog for one user type.
#[derive(Debug, Serialize)]
pub struct PlansResponse {
    /// Which price column applies.
    pub user_type: UserType,
    /// Selectable plans, oldest first.
    pub plans: Vec<SubscriptionPlan>,
    /// Plans grouped by enabled billing period, for the period tabs.
    pub periods: Vec<PeriodOffers>,
}

/// Plans offered for one billing period.
#[derive(Debug, Serialize)]
pub struct PeriodOffers {
    /// Billing period.
    pub period: BillingPeriod,
    /// Offers in catalog order.
    pub offers: Vec<PlanOffer>,
}

/// A plan priced for one billing period.
#[derive(Debug, Serialize)]
pub struct PlanOffer {
    /// Plan ID.
    pub plan_id: PlanId,
    /// Plan name.
    pub plan_name: String,
    /// Free or paid.
    pub tier: PlanTier,
    /// Per-month price in paise.
    pub monthly_rate_paise: i64,
    /// Amount charged for the whole period in paise.
    pub total_paise: i64,
}

/// Active plans offered to `user_type`, narrowed by therapist count for
/// organizations.
pub(crate) fn offered_plans(
    state: &AppState,
    user_type: UserType,
    therapist_count: Option<u32>,
) -> Result<Vec<SubscriptionPlan>, ApiError> {
    Ok(state
        .store
        .list_plans()?
        .into_iter()
        .filter(|plan| match (user_type, therapist_count) {
            (UserType::Organization, Some(count)) => plan.is_eligible_for_organization(count),
            _ => plan.is_offered_to(user_type),
        })
        .collect())
}

fn catalog(plans: Vec<SubscriptionPlan>, user_type: UserType) -> PlansResponse {
    let periods = group_by_period(&plans, user_type)
        .into_iter()
        .map(|tab| PeriodOffers {
            period: tab.period,
            offers: tab
                .plans
                .into_iter()
                .map(|plan| PlanOffer {
                    plan_id: plan.id,
                    plan_name: plan.plan_name.clone(),
                    tier: plan.tier,
                    monthly_rate_paise: plan.price(tab.period, user_type).unwrap_or(0),
                    total_paise: calculate_plan_value(Some(plan), tab.period, user_type),
                })
                .collect(),
        })
        .collect();

    PlansResponse {
        user_type,
        plans,
        periods,
    }
}

/// List plans for organizations.
pub async fn list_organization_plans(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<OrganizationPlansQuery>,
) -> Result<Json<PlansResponse>, ApiError> {
    let plans = offered_plans(&state, UserType::Organization, query.therapist_count)?;

    tracing::debug!(
        therapist_count = ?query.therapist_count,
        plans = plans.len(),
        "Listed organization plans"
    );

    Ok(Json(catalog(plans, UserType::Organization)))
}

/// List plans for individual partners.
pub async fn list_individual_plans(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<PlansResponse>, ApiError> {
    let plans = offered_plans(&state, UserType::Individual, None)?;
    Ok(Json(catalog(plans, UserType::Individual)))
}
