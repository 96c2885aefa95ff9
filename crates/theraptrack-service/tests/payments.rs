//! Payment order and verification integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{org_admin_auth, partner_auth, payment_signature, TestHarness, KEY_ID};
use serde_json::json;
use theraptrack_core::{
    BillingPeriod, CountBounds, Partner, PaymentStatus, PeriodPricing, PlanTier, Subscription,
    SubscriptionPlan, UserType,
};
use theraptrack_store::Store;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn create_order(harness: &TestHarness, partner: &Partner, period: &str) -> serde_json::Value {
    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, partner_auth(partner))
        .json(&json!({
            "owner": { "type": "partner", "id": partner.id },
            "plan_id": harness.catalog.pro.id,
            "billing_period": period
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn order_amount_is_plan_value() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({ "amount": 239_700, "currency": "INR" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_q1",
            "amount": 239_700,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&harness.razorpay)
        .await;

    let body = create_order(&harness, &partner, "quarterly").await;

    assert_eq!(body["order_id"], "order_q1");
    assert_eq!(body["key_id"], KEY_ID);
    assert_eq!(body["amount_paise"], 239_700);
    assert_eq!(body["plan_name"], "Pro Plan");
    assert_eq!(body["billing_period"], "quarterly");

    let tx = harness.store.get_payment("order_q1").unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Created);
    assert_eq!(tx.owner, partner.owner());
    assert_eq!(tx.amount_paise, 239_700);
}

#[tokio::test]
async fn free_plan_needs_no_order() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "owner": { "type": "partner", "id": partner.id },
            "plan_id": harness.catalog.free.id,
            "billing_period": "monthly"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn organization_cannot_order_plan_outside_therapist_limits() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    for _ in 0..3 {
        harness.partner(Some(org.id));
    }

    let mut solo = SubscriptionPlan::new("Solo Team", PlanTier::Paid).with_price(
        UserType::Organization,
        BillingPeriod::Monthly,
        PeriodPricing::enabled(199_900),
    );
    solo.therapist_limits = CountBounds {
        min: None,
        max: Some(1),
    };
    harness.store.put_plan(&solo).unwrap();

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.razorpay)
        .await;

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "owner": { "type": "organization", "id": org.id },
            "plan_id": solo.id,
            "billing_period": "monthly"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("3 therapists"));
}

#[tokio::test]
async fn orders_unavailable_without_razorpay() {
    let harness = TestHarness::with_config(|config| {
        config.razorpay_key_id = None;
        config.razorpay_key_secret = None;
    })
    .await;
    let partner = harness.partner(None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "owner": { "type": "partner", "id": partner.id },
            "plan_id": harness.catalog.pro.id,
            "billing_period": "monthly"
        }))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn gateway_error_is_bad_gateway() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "Authentication failed"
            }
        })))
        .mount(&harness.razorpay)
        .await;

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "owner": { "type": "partner", "id": partner.id },
            "plan_id": harness.catalog.pro.id,
            "billing_period": "monthly"
        }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "external_service_error");
}

#[tokio::test]
async fn cannot_order_for_someone_else() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    let other = harness.partner(None);

    harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, partner_auth(&other))
        .json(&json!({
            "owner": { "type": "partner", "id": partner.id },
            "plan_id": harness.catalog.pro.id,
            "billing_period": "monthly"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn verified_payment_applies_subscription_once() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    harness.mock_order("order_m1", 89_900).await;
    create_order(&harness, &partner, "monthly").await;

    let verification = json!({
        "razorpay_order_id": "order_m1",
        "razorpay_payment_id": "pay_m1",
        "razorpay_signature": payment_signature("order_m1", "pay_m1")
    });

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&verification)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "verified");
    assert_eq!(body["already_verified"], false);
    assert_eq!(body["subscription"]["plan_name"], "Pro Plan");
    assert_eq!(body["subscription"]["payment_id"], "pay_m1");
    assert!(body["subscription"]["subscription_end_date"].is_string());

    let first = harness
        .store
        .get_subscription(&partner.owner())
        .unwrap()
        .unwrap();

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&verification)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["already_verified"], true);

    let second = harness
        .store
        .get_subscription(&partner.owner())
        .unwrap()
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn organization_upgrades_from_free_to_pro() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    harness.partner(Some(org.id));

    let free = Subscription::start(
        &harness.catalog.free,
        BillingPeriod::Monthly,
        chrono::Utc::now(),
    )
    .unwrap();
    harness
        .store
        .replace_subscription(&org.owner(), free)
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({ "amount": 499_900 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_org1",
            "amount": 499_900,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&harness.razorpay)
        .await;

    let response = harness
        .server
        .post("/v1/payments/orders")
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "owner": { "type": "organization", "id": org.id },
            "plan_id": harness.catalog.pro.id,
            "billing_period": "monthly"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let order: serde_json::Value = response.json();
    assert_eq!(order["amount_paise"], 499_900);

    harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "razorpay_order_id": "order_org1",
            "razorpay_payment_id": "pay_org1",
            "razorpay_signature": payment_signature("order_org1", "pay_org1")
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/organizations/{}/subscription", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "active");
    assert_eq!(body["plan"]["plan_name"], "Pro Plan");
    assert_eq!(body["subscription"]["payment_id"], "pay_org1");
    assert_eq!(body["subscription"]["order_id"], "order_org1");
}

#[tokio::test]
async fn bad_signature_is_rejected_with_ids() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    harness.mock_order("order_m2", 89_900).await;
    create_order(&harness, &partner, "monthly").await;

    let response = harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "razorpay_order_id": "order_m2",
            "razorpay_payment_id": "pay_m2",
            "razorpay_signature": payment_signature("order_m2", "pay_other")
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "verification_failed");
    assert_eq!(body["error"]["details"]["order_id"], "order_m2");
    assert_eq!(body["error"]["details"]["payment_id"], "pay_m2");

    assert!(harness
        .store
        .get_subscription(&partner.owner())
        .unwrap()
        .is_none());
    let tx = harness.store.get_payment("order_m2").unwrap().unwrap();
    assert_eq!(tx.status, PaymentStatus::Created);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "razorpay_order_id": "order_missing",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": payment_signature("order_missing", "pay_1")
        }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn only_the_buyer_can_verify() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    let other = harness.partner(None);
    harness.mock_order("order_m3", 89_900).await;
    create_order(&harness, &partner, "monthly").await;

    harness
        .server
        .post("/v1/payments/verify")
        .add_header(AUTHORIZATION, partner_auth(&other))
        .json(&json!({
            "razorpay_order_id": "order_m3",
            "razorpay_payment_id": "pay_m3",
            "razorpay_signature": payment_signature("order_m3", "pay_m3")
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
