//! Payment checkout abstraction.
//!
//! The hosted Razorpay checkout runs outside this crate (a browser widget or
//! a mobile SDK). Implementations load it once and open it for an order.

use async_trait::async_trait;

use theraptrack_core::PaymentVerification;

use crate::error::CheckoutError;

/// Everything the checkout needs to take a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Public gateway key.
    pub key_id: String,
    /// Gateway order ID.
    pub order_id: String,
    /// Amount in paise.
    pub amount_paise: i64,
    /// ISO currency.
    pub currency: String,
    /// Description shown in the checkout.
    pub description: String,
    /// Prefilled payer details.
    pub prefill: BuyerDetails,
}

/// Payer identity prefilled into the checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerDetails {
    /// Payer name.
    pub name: String,
    /// Payer email.
    pub email: String,
    /// Payer phone.
    pub contact: Option<String>,
}

/// How the checkout ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The gateway took a payment; forward these values verbatim.
    Completed(PaymentVerification),
    /// The user closed the checkout.
    Dismissed,
}

/// A payment checkout.
#[async_trait]
pub trait Checkout: Send + Sync {
    /// Load the checkout. Called at most once per [`PlanPurchase`](crate::PlanPurchase).
    async fn load(&self) -> Result<(), CheckoutError>;

    /// Open the checkout for an order and wait for it to finish.
    async fn open(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError>;
}
