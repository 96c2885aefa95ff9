//! Common test utilities for theraptrack-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use theraptrack_core::{
    BillingPeriod, Organization, OrganizationId, Partner, PartnerId, PeriodPricing, PlanTier,
    SubscriptionPlan, UserId, UserType,
};
use theraptrack_service::auth::{JwtClaims, Role};
use theraptrack_service::crypto::hmac_sha256_hex;
use theraptrack_service::{create_router, AppState, ServiceConfig};
use theraptrack_store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const JWT_ISSUER: &str = "theraptrack";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Seeded catalog: a free plan and a paid plan offered to both user types.
pub struct Catalog {
    pub free: SubscriptionPlan,
    pub pro: SubscriptionPlan,
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for seeding and assertions.
    pub store: Arc<MemoryStore>,
    /// Mock Razorpay API.
    pub razorpay: MockServer,
    /// Seeded plans.
    pub catalog: Catalog,
}

impl TestHarness {
    /// Create a harness with Razorpay and the webhook secret configured.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness, letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let razorpay = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: Some(JWT_SECRET.into()),
            jwt_issuer: JWT_ISSUER.into(),
            admin_api_key: Some(ADMIN_KEY.into()),
            razorpay_key_id: Some(KEY_ID.into()),
            razorpay_key_secret: Some(KEY_SECRET.into()),
            razorpay_webhook_secret: Some(WEBHOOK_SECRET.into()),
            razorpay_api_url: razorpay.uri(),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let catalog = seed_catalog(store.as_ref());

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            razorpay,
            catalog,
        }
    }

    /// Create an organization directly in the store.
    pub fn organization(&self, theraptrack_controlled: bool) -> Organization {
        let org = Organization::new("Calm Minds", theraptrack_controlled);
        self.store.put_organization(&org).unwrap();
        org
    }

    /// Create a partner directly in the store.
    pub fn partner(&self, organization_id: Option<OrganizationId>) -> Partner {
        let partner = Partner::new("Asha Rao", "asha@example.com", organization_id);
        self.store.put_partner(&partner).unwrap();
        partner
    }

    /// Mock `POST /orders` to return `order_id` for `amount`.
    pub async fn mock_order(&self, order_id: &str, amount: i64) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": order_id,
                "entity": "order",
                "amount": amount,
                "amount_paid": 0,
                "amount_due": amount,
                "currency": "INR",
                "receipt": "rcpt",
                "status": "created",
                "created_at": 1_700_000_000
            })))
            .mount(&self.razorpay)
            .await;
    }
}

fn seed_catalog(store: &dyn Store) -> Catalog {
    let mut free = SubscriptionPlan::new("Free Plan", PlanTier::Free);
    for user_type in [UserType::Individual, UserType::Organization] {
        free = free.with_price(user_type, BillingPeriod::Monthly, PeriodPricing::enabled(0));
    }

    let pro = SubscriptionPlan::new("Pro Plan", PlanTier::Paid)
        .with_price(
            UserType::Individual,
            BillingPeriod::Monthly,
            PeriodPricing::enabled(89_900),
        )
        .with_price(
            UserType::Individual,
            BillingPeriod::Quarterly,
            PeriodPricing::enabled(79_900),
        )
        .with_price(
            UserType::Organization,
            BillingPeriod::Monthly,
            PeriodPricing::enabled(499_900),
        );

    store.put_plan(&free).unwrap();
    store.put_plan(&pro).unwrap();
    Catalog { free, pro }
}

/// Header carrying the admin API key.
pub const ADMIN_KEY_HEADER: HeaderName = HeaderName::from_static("x-admin-key");

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-razorpay-signature");

fn token(claims: &JwtClaims) -> HeaderValue {
    let jwt = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    HeaderValue::from_str(&format!("Bearer {jwt}")).unwrap()
}

fn claims(
    role: Role,
    organization_id: Option<OrganizationId>,
    partner_id: Option<PartnerId>,
) -> JwtClaims {
    let now = chrono::Utc::now().timestamp();
    JwtClaims {
        sub: UserId::generate().to_string(),
        role,
        organization_id,
        partner_id,
        iss: JWT_ISSUER.into(),
        exp: now + 3600,
        iat: now,
    }
}

/// Authorization header for an organization admin.
pub fn org_admin_auth(organization_id: OrganizationId) -> HeaderValue {
    token(&claims(Role::Organization, Some(organization_id), None))
}

/// Authorization header for a partner.
pub fn partner_auth(partner: &Partner) -> HeaderValue {
    token(&claims(
        Role::Partner,
        partner.organization_id,
        Some(partner.id),
    ))
}

/// Admin API key header value.
pub fn admin_key() -> HeaderValue {
    HeaderValue::from_static(ADMIN_KEY)
}

/// Signature the checkout would return for an order and payment.
pub fn payment_signature(order_id: &str, payment_id: &str) -> String {
    hmac_sha256_hex(KEY_SECRET, format!("{order_id}|{payment_id}").as_bytes()).unwrap()
}

/// Signature Razorpay would send with a webhook body.
pub fn webhook_signature(body: &[u8]) -> String {
    hmac_sha256_hex(WEBHOOK_SECRET, body).unwrap()
}
