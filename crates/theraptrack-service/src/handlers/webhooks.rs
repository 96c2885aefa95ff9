//! Razorpay webhook handler.
//!
//! Webhooks are the fallback path for payments whose checkout callback never
//! reached us (closed tab, dropped connection). They reconcile through the
//! same idempotent store operation as `/v1/payments/verify`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use theraptrack_core::{BillingError, VerifyOutcome};
use theraptrack_store::StoreError;

use crate::error::ApiError;
use crate::razorpay::{verify_webhook_signature, RazorpayError, WebhookEvent};
use crate::state::AppState;

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle Razorpay webhooks.
pub async fn razorpay_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Razorpay signature".into()))?;

    verify_webhook_signature(
        state.config.razorpay_webhook_secret.as_deref(),
        &body,
        signature,
    )
    .map_err(|e| match e {
        RazorpayError::Configuration(msg) => {
            tracing::error!("Razorpay webhook received but no webhook secret is configured");
            ApiError::Unavailable(msg)
        }
        other => {
            tracing::warn!(error = %other, "Invalid Razorpay webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        }
    })?;

    let event: WebhookEvent =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event = %event.event,
        order_id = ?event.order_id(),
        "Received Razorpay webhook"
    );

    match event.event.as_str() {
        "payment.captured" | "order.paid" => handle_payment_captured(&state, &event)?,
        "payment.failed" => handle_payment_failed(&state, &event)?,
        _ => {
            tracing::debug!(event = %event.event, "Unhandled Razorpay event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

fn handle_payment_captured(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let (Some(order_id), Some(payment)) = (event.order_id(), event.payment()) else {
        tracing::warn!(event = %event.event, "Webhook without order or payment entity");
        return Ok(());
    };

    match state
        .store
        .verify_payment(order_id, &payment.id, None, Utc::now())
    {
        Ok(verified) => {
            if verified.outcome == VerifyOutcome::Applied {
                tracing::info!(
                    owner = %verified.transaction.owner,
                    order_id = %order_id,
                    payment_id = %payment.id,
                    "Subscription applied from webhook"
                );
            } else {
                tracing::debug!(order_id = %order_id, "Payment already verified");
            }
            Ok(())
        }
        // Orders created outside this service.
        Err(StoreError::NotFound { .. }) => {
            tracing::warn!(order_id = %order_id, "Webhook for unknown order");
            Ok(())
        }
        Err(StoreError::Billing(BillingError::PaymentConflict { .. })) => {
            tracing::error!(
                order_id = %order_id,
                payment_id = %payment.id,
                "Second captured payment for an already verified order"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_payment_failed(state: &AppState, event: &WebhookEvent) -> Result<(), ApiError> {
    let Some(order_id) = event.order_id() else {
        tracing::warn!("payment.failed webhook without order ID");
        return Ok(());
    };

    let reason = event
        .payment()
        .and_then(|payment| payment.error_description.as_deref())
        .unwrap_or("payment failed");

    match state
        .store
        .record_payment_failure(order_id, reason, Utc::now())
    {
        Ok(transaction) => {
            tracing::info!(
                owner = %transaction.owner,
                order_id = %order_id,
                status = ?transaction.status,
                reason,
                "Payment failure recorded"
            );
            Ok(())
        }
        Err(StoreError::NotFound { .. }) => {
            tracing::warn!(order_id = %order_id, "Failure webhook for unknown order");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
