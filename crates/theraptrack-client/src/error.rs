//! Client error types.

use theraptrack_core::BillingError;

/// Errors that can occur when calling the billing service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The selected plan needs a verified payment.
    #[error("payment required for plan {plan_name}")]
    PaymentRequired {
        /// Plan that was selected.
        plan_name: String,
    },

    /// The server could not verify the payment.
    #[error("payment verification failed: order={order_id}, payment={payment_id}")]
    VerificationFailed {
        /// Gateway order ID.
        order_id: String,
        /// Gateway payment ID.
        payment_id: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// The checkout widget could not be loaded or opened.
#[derive(Debug, thiserror::Error)]
#[error("checkout error: {0}")]
pub struct CheckoutError(pub String);

/// Why a plan purchase did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// The user closed the checkout. Nothing was charged and the previous
    /// subscription is unchanged.
    #[error("payment cancelled by user")]
    UserCancelled {
        /// Abandoned gateway order.
        order_id: String,
    },

    /// The gateway took a payment the service could not verify. The user
    /// should contact support with these IDs.
    #[error(
        "payment verification failed, please contact support (order {order_id}, payment {payment_id})"
    )]
    VerificationFailed {
        /// Gateway order ID.
        order_id: String,
        /// Gateway payment ID.
        payment_id: String,
    },

    /// The selection was rejected locally.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// The billing service rejected a request.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The checkout failed before any payment.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl PurchaseError {
    /// Whether the error is informational rather than a failure.
    #[must_use]
    pub const fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled { .. })
    }
}
