//! Plan purchase orchestration.
//!
//! [`PlanPurchase`] walks a [`PurchaseFlow`] against the billing API:
//!
//! - free plans are applied with a single call
//! - paid plans create an order, open the checkout and forward the checkout
//!   result for verification
//!
//! The subscription is re-fetched after every successful purchase.

use chrono::Utc;
use tokio::sync::OnceCell;

use theraptrack_core::{
    BillingPeriod, PurchaseFlow, PurchasePath, SubscriptionOwner, SubscriptionPlan,
};

use crate::checkout::{BuyerDetails, Checkout, CheckoutOutcome, CheckoutRequest};
use crate::client::TheraPTrackClient;
use crate::error::{ClientError, PurchaseError};
use crate::types::{PaymentOrder, SubscriptionResponse};

/// Buys plans for one subscription owner.
pub struct PlanPurchase<C> {
    client: TheraPTrackClient,
    checkout: C,
    owner: SubscriptionOwner,
    buyer: BuyerDetails,
    checkout_loaded: OnceCell<()>,
}

impl<C: Checkout> PlanPurchase<C> {
    /// Create an orchestrator for `owner`, prefilling the checkout with `buyer`.
    #[must_use]
    pub fn new(
        client: TheraPTrackClient,
        checkout: C,
        owner: SubscriptionOwner,
        buyer: BuyerDetails,
    ) -> Self {
        Self {
            client,
            checkout,
            owner,
            buyer,
            checkout_loaded: OnceCell::new(),
        }
    }

    /// The owner plans are bought for.
    #[must_use]
    pub const fn owner(&self) -> &SubscriptionOwner {
        &self.owner
    }

    /// The checkout payments are taken with.
    #[must_use]
    pub const fn checkout(&self) -> &C {
        &self.checkout
    }

    /// Buy `plan` for `period` and return the refreshed subscription.
    ///
    /// # Errors
    ///
    /// - `PurchaseError::Billing` if the choice is the current plan or the
    ///   period is not offered.
    /// - `PurchaseError::UserCancelled` if the checkout was closed.
    /// - `PurchaseError::VerificationFailed` if a payment was taken but not
    ///   verified.
    /// - `PurchaseError::Client` or `PurchaseError::Checkout` for failures
    ///   before any payment.
    pub async fn purchase(
        &self,
        plan: &SubscriptionPlan,
        period: BillingPeriod,
    ) -> Result<SubscriptionResponse, PurchaseError> {
        let current = self.client.subscription(&self.owner).await?;
        let mut flow = PurchaseFlow::for_subscription(
            self.owner.user_type(),
            current.subscription.as_ref(),
            Utc::now(),
        );

        match flow.select(plan, period)? {
            PurchasePath::Free => {
                if let Err(e) = self.client.select_plan(&self.owner, plan.id, period).await {
                    flow.fail(e.to_string())?;
                    return Err(e.into());
                }
                flow.free_plan_applied()?;
                tracing::info!(owner = %self.owner, plan = %plan.plan_name, "Free plan applied");
            }
            PurchasePath::Paid { amount_paise } => {
                tracing::debug!(
                    owner = %self.owner,
                    plan = %plan.plan_name,
                    amount_paise,
                    "Starting paid purchase"
                );
                self.pay(&mut flow, plan, period).await?;
            }
        }

        Ok(self.client.subscription(&self.owner).await?)
    }

    async fn pay(
        &self,
        flow: &mut PurchaseFlow,
        plan: &SubscriptionPlan,
        period: BillingPeriod,
    ) -> Result<(), PurchaseError> {
        if let Err(e) = self.load_checkout().await {
            flow.fail(e.to_string())?;
            return Err(e);
        }

        let order = match self.client.create_order(self.owner, plan.id, period).await {
            Ok(order) => order,
            Err(e) => {
                flow.fail(e.to_string())?;
                return Err(e.into());
            }
        };
        flow.order_created(order.order_id.clone())?;

        let outcome = match self.checkout.open(self.checkout_request(&order)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                flow.fail(e.to_string())?;
                return Err(e.into());
            }
        };

        let verification = match outcome {
            CheckoutOutcome::Completed(verification) => verification,
            CheckoutOutcome::Dismissed => {
                flow.checkout_dismissed()?;
                tracing::info!(order_id = %order.order_id, "Checkout dismissed by user");
                return Err(PurchaseError::UserCancelled {
                    order_id: order.order_id,
                });
            }
        };
        // A payment exists from here on; every failure needs the ids.
        if let Err(e) = flow.checkout_completed(
            &verification.razorpay_order_id,
            verification.razorpay_payment_id.clone(),
        ) {
            tracing::error!(
                expected_order_id = %order.order_id,
                order_id = %verification.razorpay_order_id,
                payment_id = %verification.razorpay_payment_id,
                error = %e,
                "Checkout returned a payment for another order"
            );
            return Err(PurchaseError::VerificationFailed {
                order_id: verification.razorpay_order_id,
                payment_id: verification.razorpay_payment_id,
            });
        }

        match self.client.verify_payment(&verification).await {
            Ok(verified) => {
                flow.verified()?;
                tracing::info!(
                    order_id = %verified.order_id,
                    payment_id = %verified.payment_id,
                    already_verified = verified.already_verified,
                    "Payment verified"
                );
                Ok(())
            }
            Err(e) => {
                flow.verification_failed()?;
                tracing::error!(
                    order_id = %verification.razorpay_order_id,
                    payment_id = %verification.razorpay_payment_id,
                    error = %e,
                    "Payment taken but not verified"
                );
                let (order_id, payment_id) = match e {
                    ClientError::VerificationFailed {
                        order_id,
                        payment_id,
                    } => (order_id, payment_id),
                    _ => (
                        verification.razorpay_order_id,
                        verification.razorpay_payment_id,
                    ),
                };
                Err(PurchaseError::VerificationFailed {
                    order_id,
                    payment_id,
                })
            }
        }
    }

    /// Load the checkout once; later calls reuse the first success.
    async fn load_checkout(&self) -> Result<(), PurchaseError> {
        self.checkout_loaded
            .get_or_try_init(|| async {
                tracing::debug!("Loading checkout");
                self.checkout.load().await
            })
            .await?;
        Ok(())
    }

    fn checkout_request(&self, order: &PaymentOrder) -> CheckoutRequest {
        CheckoutRequest {
            key_id: order.key_id.clone(),
            order_id: order.order_id.clone(),
            amount_paise: order.amount_paise,
            currency: order.currency.clone(),
            description: format!("{} ({})", order.plan_name, order.billing_period),
            prefill: self.buyer.clone(),
        }
    }
}
