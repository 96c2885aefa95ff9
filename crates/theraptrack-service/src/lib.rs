//! TheraPTrack billing HTTP API service.
//!
//! This crate provides the HTTP API behind the subscription pages of the
//! TheraPTrack frontend:
//!
//! - Plan catalog for organizations and individual partners
//! - Subscription lookup, free-plan selection and cancellation
//! - Bulk plan assignment for an organization's partners
//! - Razorpay order creation, payment verification and webhooks
//! - Admin provisioning of plans, organizations and partners
//!
//! # Authentication
//!
//! 1. **User JWTs** (HS256) carrying `sub`, `role`, `organization_id` and
//!    `partner_id` claims for dashboard requests.
//! 2. **Admin API key** (`X-Admin-Key`) for platform administration.
//! 3. **Webhook signatures** (`X-Razorpay-Signature`) for gateway callbacks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod razorpay;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use razorpay::{RazorpayClient, RazorpayError};
pub use routes::create_router;
pub use state::AppState;
