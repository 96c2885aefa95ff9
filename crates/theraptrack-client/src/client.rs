//! Billing service HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use theraptrack_core::{
    BillingPeriod, OrganizationId, PaymentVerification, PlanId, SubscriptionOwner,
};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, AssignPartnersResponse, CancelResponse, CreateOrderRequest, PaymentOrder,
    PlansResponse, SelectPlanRequest, SubscriptionResponse, VerifyPaymentResponse,
};

/// TheraPTrack billing API client.
///
/// Authenticates every request with the dashboard user's JWT.
#[derive(Debug, Clone)]
pub struct TheraPTrackClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TheraPTrackClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the billing service (e.g., `"http://billing:8080"`)
    /// * `token` - The user's JWT
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ClientError::Configuration("token is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    // ========================================================================
    // Plans
    // ========================================================================

    /// List organization plans, optionally narrowed to a therapist count.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn organization_plans(
        &self,
        therapist_count: Option<u32>,
    ) -> Result<PlansResponse, ClientError> {
        let mut request = self.get("/v1/plans/organization");
        if let Some(count) = therapist_count {
            request = request.query(&[("therapist_count", count)]);
        }
        self.send(request).await
    }

    /// List individual partner plans.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn individual_plans(&self) -> Result<PlansResponse, ClientError> {
        self.send(self.get("/v1/plans/individual")).await
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Get an owner's subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn subscription(
        &self,
        owner: &SubscriptionOwner,
    ) -> Result<SubscriptionResponse, ClientError> {
        self.send(self.get(&subscription_path(owner))).await
    }

    /// Select a free plan.
    ///
    /// # Errors
    ///
    /// `ClientError::PaymentRequired` for paid plans, or any request failure.
    pub async fn select_plan(
        &self,
        owner: &SubscriptionOwner,
        plan_id: PlanId,
        billing_period: BillingPeriod,
    ) -> Result<SubscriptionResponse, ClientError> {
        let request = self.post(&subscription_path(owner)).json(&SelectPlanRequest {
            plan_id,
            billing_period,
        });
        self.send(request).await
    }

    /// Cancel an owner's subscription at the end of its period.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn cancel_subscription(
        &self,
        owner: &SubscriptionOwner,
    ) -> Result<CancelResponse, ClientError> {
        let path = format!("{}/cancel", subscription_path(owner));
        self.send(self.post(&path)).await
    }

    /// Give every partner of an organization the same plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn assign_partner_subscriptions(
        &self,
        organization_id: OrganizationId,
        plan_id: PlanId,
        billing_period: BillingPeriod,
    ) -> Result<AssignPartnersResponse, ClientError> {
        let path = format!("/v1/organizations/{organization_id}/partners/subscriptions");
        let request = self.post(&path).json(&SelectPlanRequest {
            plan_id,
            billing_period,
        });
        self.send(request).await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Create a gateway order for a paid plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_order(
        &self,
        owner: SubscriptionOwner,
        plan_id: PlanId,
        billing_period: BillingPeriod,
    ) -> Result<PaymentOrder, ClientError> {
        let request = self.post("/v1/payments/orders").json(&CreateOrderRequest {
            owner,
            plan_id,
            billing_period,
        });
        self.send(request).await
    }

    /// Forward the checkout result for verification.
    ///
    /// # Errors
    ///
    /// `ClientError::VerificationFailed` if the signature does not verify, or
    /// any request failure.
    pub async fn verify_payment(
        &self,
        verification: &PaymentVerification,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        let request = self.post("/v1/payments/verify").json(verification);
        self.send(request).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let detail = |key: &str| {
                    api_error
                        .error
                        .details
                        .as_ref()
                        .and_then(|d| d.get(key))
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };

                match api_error.error.code.as_str() {
                    "payment_required" => Err(ClientError::PaymentRequired {
                        plan_name: detail("plan_name"),
                    }),
                    "verification_failed" => Err(ClientError::VerificationFailed {
                        order_id: detail("order_id"),
                        payment_id: detail("payment_id"),
                    }),
                    code => {
                        tracing::debug!(
                            status = status.as_u16(),
                            code,
                            message = %api_error.error.message,
                            "Billing API error"
                        );
                        Err(ClientError::Api {
                            code: code.to_string(),
                            message: api_error.error.message.clone(),
                            status: status.as_u16(),
                        })
                    }
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

fn subscription_path(owner: &SubscriptionOwner) -> String {
    match owner {
        SubscriptionOwner::Organization(id) => format!("/v1/organizations/{id}/subscription"),
        SubscriptionOwner::Partner(id) => format!("/v1/partners/{id}/subscription"),
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}
