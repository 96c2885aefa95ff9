//! TheraPTrack billing client SDK.
//!
//! This crate provides a typed client for the billing API and [`PlanPurchase`],
//! which runs the plan selection and payment flow against a [`Checkout`].
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use theraptrack_client::{
//!     BuyerDetails, Checkout, CheckoutError, CheckoutOutcome, CheckoutRequest, PlanPurchase,
//!     PurchaseError, TheraPTrackClient,
//! };
//! use theraptrack_core::{BillingPeriod, PartnerId, SubscriptionOwner};
//!
//! struct HostedCheckout;
//!
//! #[async_trait]
//! impl Checkout for HostedCheckout {
//!     async fn load(&self) -> Result<(), CheckoutError> {
//!         Ok(())
//!     }
//!
//!     async fn open(&self, _request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError> {
//!         Ok(CheckoutOutcome::Dismissed)
//!     }
//! }
//!
//! # async fn example(partner_id: PartnerId) -> Result<(), PurchaseError> {
//! let client = TheraPTrackClient::new("http://billing:8080", "user-jwt")?;
//! let plans = client.individual_plans().await?;
//!
//! let purchase = PlanPurchase::new(
//!     client,
//!     HostedCheckout,
//!     SubscriptionOwner::Partner(partner_id),
//!     BuyerDetails {
//!         name: "Asha Rao".into(),
//!         email: "asha@example.com".into(),
//!         contact: None,
//!     },
//! );
//!
//! match purchase.purchase(&plans.plans[0], BillingPeriod::Monthly).await {
//!     Ok(subscription) => println!("Now on {:?}", subscription.plan.map(|p| p.plan_name)),
//!     Err(e) if e.is_user_cancelled() => println!("Payment cancelled"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod checkout;
mod client;
mod error;
mod purchase;
mod types;

pub use checkout::{BuyerDetails, Checkout, CheckoutOutcome, CheckoutRequest};
pub use client::{ClientOptions, TheraPTrackClient};
pub use error::{CheckoutError, ClientError, PurchaseError};
pub use purchase::PlanPurchase;
pub use types::*;
