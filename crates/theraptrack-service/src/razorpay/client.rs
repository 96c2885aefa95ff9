//! Razorpay API client implementation.

use std::time::Duration;

use reqwest::Client;

use super::types::{CreateOrderRequest, Order, RazorpayErrorResponse};
use crate::crypto::verify_hmac_sha256_hex;

/// Error type for Razorpay operations.
#[derive(Debug, thiserror::Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay API returned an error.
    #[error("Razorpay API error: {code} - {description}")]
    Api {
        /// Error code.
        code: String,
        /// Error description.
        description: String,
        /// HTTP status.
        status: u16,
    },

    /// Checkout or webhook signature did not match.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Razorpay API client.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Arguments
    ///
    /// * `api_url` - API base URL (`https://api.razorpay.com/v1` in production)
    /// * `key_id` - Key ID (`rzp_test_...` or `rzp_live_...`)
    /// * `key_secret` - Key secret, also used for checkout signatures
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, RazorpayError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let api_url = api_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_url,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Public key ID, handed to the checkout.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create an order.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, RazorpayError> {
        tracing::debug!(
            amount = request.amount,
            currency = %request.currency,
            receipt = %request.receipt,
            "Creating Razorpay order"
        );

        let response = self
            .client
            .post(format!("{}/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify the signature the checkout returns on success.
    ///
    /// The signature is `HMAC_SHA256(key_secret, order_id + "|" + payment_id)`
    /// in hex.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        let message = format!("{order_id}|{payment_id}");
        if verify_hmac_sha256_hex(&self.key_secret, message.as_bytes(), signature) {
            Ok(())
        } else {
            Err(RazorpayError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RazorpayError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<RazorpayErrorResponse, _> = response.json().await;

        match error_body {
            Ok(body) => Err(RazorpayError::Api {
                code: body.error.code,
                description: body.error.description,
                status: status.as_u16(),
            }),
            Err(_) => Err(RazorpayError::Api {
                code: "unknown".to_string(),
                description: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Verify a webhook body against the `X-Razorpay-Signature` header.
///
/// # Errors
///
/// - `Configuration` if no webhook secret is set.
/// - `InvalidSignature` if the signature does not match.
pub fn verify_webhook_signature(
    webhook_secret: Option<&str>,
    payload: &[u8],
    signature: &str,
) -> Result<(), RazorpayError> {
    let secret = webhook_secret
        .ok_or_else(|| RazorpayError::Configuration("Webhook secret not configured".into()))?;

    if verify_hmac_sha256_hex(secret, payload, signature) {
        Ok(())
    } else {
        Err(RazorpayError::InvalidSignature)
    }
}
