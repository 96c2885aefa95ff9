//! Payment transactions for paid plan purchases.
//!
//! Every gateway order is recorded as a `PaymentTransaction` before checkout
//! opens. The subscription changes only when the transaction becomes
//! `Verified`, and a transaction is applied at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, Result};
use crate::plan::BillingPeriod;
use crate::subscription::SubscriptionOwner;
use crate::{PlanId, ReceiptId};

/// Default settlement currency.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Lifecycle of a gateway order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, no verified payment yet.
    Created,
    /// A payment for the order was verified and the subscription applied.
    Verified,
    /// The gateway reported a failed payment attempt.
    Failed,
}

/// The three values returned by the checkout, forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    /// Gateway order ID.
    pub razorpay_order_id: String,
    /// Gateway payment ID.
    pub razorpay_payment_id: String,
    /// Hex HMAC-SHA256 signature over `order_id|payment_id`.
    pub razorpay_signature: String,
}

/// Result of recording a verified payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// First verification; the subscription must be applied.
    Applied,
    /// The same payment was already verified; nothing to do.
    AlreadyVerified,
}

/// A gateway order and its verification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Gateway order ID (primary key).
    pub order_id: String,

    /// Receipt sent with the order.
    pub receipt: ReceiptId,

    /// Who is buying.
    pub owner: SubscriptionOwner,

    /// Plan being bought.
    pub plan_id: PlanId,

    /// Period being bought.
    pub billing_period: BillingPeriod,

    /// Charged amount in paise.
    pub amount_paise: i64,

    /// ISO currency code.
    pub currency: String,

    /// Current status.
    pub status: PaymentStatus,

    /// Verified gateway payment ID.
    #[serde(default)]
    pub payment_id: Option<String>,

    /// Signature that verified the payment, kept for audits.
    #[serde(default)]
    pub signature: Option<String>,

    /// Last failure reported by the gateway.
    #[serde(default)]
    pub failure_reason: Option<String>,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction last changed.
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Record a freshly created gateway order.
    #[must_use]
    pub fn created(
        order_id: impl Into<String>,
        receipt: ReceiptId,
        owner: SubscriptionOwner,
        plan_id: PlanId,
        billing_period: BillingPeriod,
        amount_paise: i64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: order_id.into(),
            receipt,
            owner,
            plan_id,
            billing_period,
            amount_paise,
            currency: currency.into(),
            status: PaymentStatus::Created,
            payment_id: None,
            signature: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a verified payment.
    ///
    /// Verifying the same payment twice is a no-op. A failed attempt may be
    /// followed by a successful one on the same order.
    ///
    /// # Errors
    ///
    /// `PaymentConflict` if the order was already verified with a different
    /// payment.
    pub fn mark_verified(
        &mut self,
        payment_id: &str,
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome> {
        match (self.status, self.payment_id.as_deref()) {
            (PaymentStatus::Verified, Some(existing)) if existing == payment_id => {
                Ok(VerifyOutcome::AlreadyVerified)
            }
            (PaymentStatus::Verified, _) => Err(BillingError::PaymentConflict {
                order_id: self.order_id.clone(),
            }),
            (PaymentStatus::Created | PaymentStatus::Failed, _) => {
                self.status = PaymentStatus::Verified;
                self.payment_id = Some(payment_id.to_string());
                self.signature = signature.map(str::to_string);
                self.failure_reason = None;
                self.updated_at = now;
                Ok(VerifyOutcome::Applied)
            }
        }
    }

    /// Record a failed payment attempt. Verified transactions are left alone.
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        if self.status != PaymentStatus::Verified {
            self.status = PaymentStatus::Failed;
            self.failure_reason = Some(reason.into());
            self.updated_at = now;
        }
    }
}
