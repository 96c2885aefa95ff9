//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use theraptrack_core::BillingError;
use theraptrack_store::StoreError;

use crate::razorpay::RazorpayError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - invalid state transition or duplicate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The plan needs a verified payment.
    #[error("payment required for plan {plan_name}")]
    PaymentRequired {
        /// Plan that was selected.
        plan_name: String,
    },

    /// Payment signature did not verify.
    #[error("payment verification failed")]
    VerificationFailed {
        /// Gateway order ID.
        order_id: String,
        /// Gateway payment ID.
        payment_id: String,
    },

    /// A dependency is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::PaymentRequired { plan_name } => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_required",
                self.to_string(),
                Some(serde_json::json!({ "plan_name": plan_name })),
            ),
            Self::VerificationFailed {
                order_id,
                payment_id,
            } => (
                StatusCode::BAD_REQUEST,
                "verification_failed",
                "Payment verification failed. Please contact support.".to_string(),
                Some(serde_json::json!({
                    "order_id": order_id,
                    "payment_id": payment_id
                })),
            ),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::PlanNotFound { plan_id } => {
                Self::NotFound(format!("plan not found: {plan_id}"))
            }
            BillingError::PaymentRequired { plan_name } => Self::PaymentRequired { plan_name },
            BillingError::SameAsCurrent { .. }
            | BillingError::PaymentConflict { .. }
            | BillingError::NotCancellable { .. }
            | BillingError::NoEndDate
            | BillingError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            BillingError::InvalidPlan(_)
            | BillingError::InvalidBillingPeriod(_)
            | BillingError::PeriodNotAvailable { .. }
            | BillingError::InvalidId(_) => Self::BadRequest(err.to_string()),
            BillingError::DateOutOfRange => Self::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            StoreError::Billing(err) => err.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<RazorpayError> for ApiError {
    fn from(err: RazorpayError) -> Self {
        tracing::error!(error = %err, "Razorpay request failed");
        match err {
            RazorpayError::Configuration(msg) => Self::Unavailable(msg),
            _ => Self::ExternalService("Payment gateway request failed".into()),
        }
    }
}
