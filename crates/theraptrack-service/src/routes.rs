//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, payments, plans, subscriptions, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for `/v1` endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Plans (JWT auth)
/// - `GET /v1/plans/organization` - Organization catalog (`?therapist_count=N`)
/// - `GET /v1/plans/individual` - Individual partner catalog
///
/// ## Subscriptions (JWT auth)
/// - `GET|POST /v1/organizations/:id/subscription` - Read or select a free plan
/// - `POST /v1/organizations/:id/subscription/cancel` - Cancel
/// - `POST /v1/organizations/:id/partners/subscriptions` - Assign a plan to all partners
/// - `GET|POST /v1/partners/:id/subscription` - Read or select a free plan
/// - `POST /v1/partners/:id/subscription/cancel` - Cancel
///
/// ## Payments (JWT auth)
/// - `POST /v1/payments/orders` - Create a Razorpay order for a paid plan
/// - `POST /v1/payments/verify` - Verify a checkout result
///
/// ## Admin (API key auth)
/// - `PUT /v1/admin/plans` - Create or replace a plan
/// - `POST /v1/admin/organizations` - Create an organization
/// - `POST /v1/admin/partners` - Create a partner
/// - `PUT /v1/admin/organizations/:id/subscription` - Set an organization's plan
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/razorpay` - Razorpay webhooks
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let admin_routes = Router::new()
        .route("/plans", put(admin::upsert_plan))
        .route("/organizations", post(admin::create_organization))
        .route("/partners", post(admin::create_partner))
        .route(
            "/organizations/:id/subscription",
            put(admin::set_organization_subscription),
        );

    let api_routes = Router::new()
        // Plans
        .route("/plans/organization", get(plans::list_organization_plans))
        .route("/plans/individual", get(plans::list_individual_plans))
        // Organization subscriptions
        .route(
            "/organizations/:id/subscription",
            get(subscriptions::get_organization_subscription)
                .post(subscriptions::select_organization_subscription),
        )
        .route(
            "/organizations/:id/subscription/cancel",
            post(subscriptions::cancel_organization_subscription),
        )
        .route(
            "/organizations/:id/partners/subscriptions",
            post(subscriptions::assign_partner_subscriptions),
        )
        // Partner subscriptions
        .route(
            "/partners/:id/subscription",
            get(subscriptions::get_partner_subscription)
                .post(subscriptions::select_partner_subscription),
        )
        .route(
            "/partners/:id/subscription/cancel",
            post(subscriptions::cancel_partner_subscription),
        )
        // Payments
        .route("/payments/orders", post(payments::create_order))
        .route("/payments/verify", post(payments::verify_payment))
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by Razorpay)
        .route("/webhooks/razorpay", post(webhooks::razorpay_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(Arc::new(state))
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}
