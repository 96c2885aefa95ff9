//! Razorpay order and payment verification handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use theraptrack_core::{
    BillingPeriod, PaymentStatus, PaymentTransaction, PaymentVerification, PlanId, PurchaseFlow,
    PurchasePath, ReceiptId, Subscription, SubscriptionOwner, VerifyOutcome,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::subscriptions::{ensure_eligible, ensure_self_managed, load_active_plan};
use crate::razorpay::{CreateOrderRequest, RazorpayClient};
use crate::state::AppState;

/// Request to start a paid plan purchase.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentOrderRequest {
    /// Who the subscription is for.
    pub owner: SubscriptionOwner,
    /// Plan to buy.
    pub plan_id: PlanId,
    /// Billing period to buy.
    pub billing_period: BillingPeriod,
}

/// Everything the checkout needs to open.
#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    /// Razorpay order ID.
    pub order_id: String,
    /// Razorpay key ID for the checkout.
    pub key_id: String,
    /// Amount to charge in paise.
    pub amount_paise: i64,
    /// ISO currency.
    pub currency: String,
    /// Our receipt reference.
    pub receipt: ReceiptId,
    /// Plan being bought.
    pub plan_id: PlanId,
    /// Plan name for the checkout description.
    pub plan_name: String,
    /// Billing period being bought.
    pub billing_period: BillingPeriod,
}

/// Result of a payment verification.
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    /// Razorpay order ID.
    pub order_id: String,
    /// Razorpay payment ID.
    pub payment_id: String,
    /// Transaction status after verification.
    pub status: PaymentStatus,
    /// True when the order had already been verified by an earlier call or webhook.
    pub already_verified: bool,
    /// The owner's subscription after verification.
    pub subscription: Option<Subscription>,
}

fn razorpay(state: &AppState) -> Result<&RazorpayClient, ApiError> {
    state
        .razorpay
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("Payments are not configured".into()))
}

/// Create a Razorpay order for a paid plan.
///
/// The amount is the plan value for the owner's user type and period; the
/// client never supplies it.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreatePaymentOrderRequest>,
) -> Result<(StatusCode, Json<PaymentOrderResponse>), ApiError> {
    let owner = request.owner;
    user.require_owner(&owner)?;
    let razorpay = razorpay(&state)?;
    ensure_self_managed(&state, &owner)?;

    let current = state.store.get_subscription(&owner)?;
    let plan = load_active_plan(&state, &request.plan_id)?;

    let mut flow = PurchaseFlow::for_subscription(owner.user_type(), current.as_ref(), Utc::now());
    let amount_paise = match flow.select(&plan, request.billing_period)? {
        PurchasePath::Paid { amount_paise } if amount_paise > 0 => amount_paise,
        PurchasePath::Paid { .. } | PurchasePath::Free => {
            return Err(ApiError::BadRequest(format!(
                "plan {} does not require payment",
                plan.plan_name
            )));
        }
    };
    ensure_eligible(&state, &owner, &plan)?;

    let receipt = ReceiptId::generate();
    let order = razorpay
        .create_order(&CreateOrderRequest {
            amount: amount_paise,
            currency: state.config.payment_currency.clone(),
            receipt: receipt.to_string(),
            notes: BTreeMap::from([
                ("owner".to_string(), owner.to_string()),
                ("plan_id".to_string(), plan.id.to_string()),
                ("billing_period".to_string(), request.billing_period.to_string()),
            ]),
        })
        .await?;

    if order.amount != amount_paise {
        tracing::warn!(
            order_id = %order.id,
            expected = amount_paise,
            actual = order.amount,
            "Razorpay order amount differs from plan value"
        );
        return Err(ApiError::ExternalService(
            "Payment gateway returned an unexpected amount".into(),
        ));
    }

    let transaction = PaymentTransaction::created(
        order.id.clone(),
        receipt,
        owner,
        plan.id,
        request.billing_period,
        amount_paise,
        order.currency.clone(),
    );
    state.store.put_payment(&transaction)?;
    flow.order_created(order.id.clone())?;

    tracing::info!(
        owner = %owner,
        order_id = %order.id,
        plan = %plan.plan_name,
        period = %request.billing_period,
        amount_paise,
        "Payment order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PaymentOrderResponse {
            order_id: order.id,
            key_id: razorpay.key_id().to_string(),
            amount_paise,
            currency: order.currency,
            receipt,
            plan_id: plan.id,
            plan_name: plan.plan_name,
            billing_period: request.billing_period,
        }),
    ))
}

/// Verify a checkout result and apply the purchased subscription.
///
/// Verifying the same order and payment again returns the stored result.
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(verification): Json<PaymentVerification>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let PaymentVerification {
        razorpay_order_id: order_id,
        razorpay_payment_id: payment_id,
        razorpay_signature: signature,
    } = verification;

    let transaction = state
        .store
        .get_payment(&order_id)?
        .ok_or_else(|| ApiError::NotFound(format!("payment order not found: {order_id}")))?;
    user.require_owner(&transaction.owner)?;

    razorpay(&state)?
        .verify_payment_signature(&order_id, &payment_id, &signature)
        .map_err(|e| {
            tracing::warn!(
                order_id = %order_id,
                payment_id = %payment_id,
                error = %e,
                "Payment signature verification failed"
            );
            ApiError::VerificationFailed {
                order_id: order_id.clone(),
                payment_id: payment_id.clone(),
            }
        })?;

    let verified = state
        .store
        .verify_payment(&order_id, &payment_id, Some(&signature), Utc::now())?;

    let already_verified = verified.outcome == VerifyOutcome::AlreadyVerified;
    tracing::info!(
        owner = %verified.transaction.owner,
        order_id = %order_id,
        payment_id = %payment_id,
        already_verified,
        "Payment verified"
    );

    Ok(Json(VerifyPaymentResponse {
        order_id,
        payment_id,
        status: verified.transaction.status,
        already_verified,
        subscription: verified.subscription,
    }))
}
