//! Razorpay integration for subscription payments.
//!
//! Razorpay handles:
//! - Order creation for a server-computed amount
//! - Checkout signatures (`order_id|payment_id`)
//! - Webhooks for payments whose client-side verification never arrived

pub mod client;
pub mod types;

pub use client::{verify_webhook_signature, RazorpayClient, RazorpayError};
pub use types::*;
