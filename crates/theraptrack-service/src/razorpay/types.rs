//! Razorpay API types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in the smallest currency unit (paise).
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Our receipt reference (max 40 characters).
    pub receipt: String,
    /// Free-form key/value notes echoed back in webhooks.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

/// Razorpay order object.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Order ID (`order_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// Amount captured so far.
    #[serde(default)]
    pub amount_paid: i64,
    /// Amount still due.
    #[serde(default)]
    pub amount_due: i64,
    /// Currency.
    pub currency: String,
    /// Receipt we supplied.
    #[serde(default)]
    pub receipt: Option<String>,
    /// `created`, `attempted` or `paid`.
    #[serde(default)]
    pub status: String,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created_at: i64,
}

/// Razorpay payment object (webhook payloads).
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    /// Payment ID (`pay_...`).
    pub id: String,
    /// Order the payment belongs to.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Amount in paise.
    #[serde(default)]
    pub amount: i64,
    /// Currency.
    #[serde(default)]
    pub currency: String,
    /// `created`, `authorized`, `captured`, `refunded` or `failed`.
    #[serde(default)]
    pub status: String,
    /// Failure description for failed payments.
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event name (e.g. `payment.captured`).
    pub event: String,
    /// Entities attached to the event.
    #[serde(default)]
    pub payload: WebhookPayload,
}

/// Entities carried by a webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    /// Payment entity, if any.
    #[serde(default)]
    pub payment: Option<EntityWrapper<Payment>>,
    /// Order entity, if any.
    #[serde(default)]
    pub order: Option<EntityWrapper<Order>>,
}

/// Razorpay wraps webhook entities as `{"entity": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrapper<T> {
    /// The wrapped entity.
    pub entity: T,
}

impl WebhookEvent {
    /// Order ID the event refers to.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.payload
            .order
            .as_ref()
            .map(|order| order.entity.id.as_str())
            .or_else(|| {
                self.payload
                    .payment
                    .as_ref()
                    .and_then(|payment| payment.entity.order_id.as_deref())
            })
    }

    /// Payment entity carried by the event.
    #[must_use]
    pub fn payment(&self) -> Option<&Payment> {
        self.payload.payment.as_ref().map(|payment| &payment.entity)
    }
}

/// Razorpay error response.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorResponse {
    /// Error details.
    pub error: RazorpayErrorDetails,
}

/// Razorpay error details.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorDetails {
    /// Error code (e.g. `BAD_REQUEST_ERROR`).
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// Offending field, if any.
    #[serde(default)]
    pub field: Option<String>,
}
