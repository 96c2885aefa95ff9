//! Subscription integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use chrono::Utc;
use common::{org_admin_auth, partner_auth, TestHarness};
use serde_json::json;
use theraptrack_core::{BillingPeriod, PlanId, Subscription};
use theraptrack_store::Store;

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn new_organization_has_no_subscription() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);

    let response = harness
        .server
        .get(&format!("/v1/organizations/{}/subscription", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "none");
    assert_eq!(body["subscription"], serde_json::Value::Null);
    assert_eq!(body["can_cancel"], false);
    assert_eq!(body["selection_action"], "select");
    assert_eq!(body["selection_label"], "Select Plan");
}

#[tokio::test]
async fn other_organization_admin_is_forbidden() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    let other = harness.organization(false);

    harness
        .server
        .get(&format!("/v1/organizations/{}/subscription", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(other.id))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    harness
        .server
        .get(&format!("/v1/partners/{}/subscription", partner.id))
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Free Plan Selection
// ============================================================================

#[tokio::test]
async fn partner_selects_free_plan() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    let response = harness
        .server
        .post(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "plan_id": harness.catalog.free.id,
            "billing_period": "monthly"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "active");
    assert_eq!(body["subscription"]["plan_name"], "Free Plan");
    assert_eq!(
        body["subscription"]["subscription_end_date"],
        serde_json::Value::Null
    );
    assert_eq!(body["can_cancel"], false);
    assert_eq!(body["has_upgradeable_plans"], true);
    assert_eq!(body["selection_action"], "upgrade");

    let stored = harness
        .store
        .get_subscription(&partner.owner())
        .unwrap()
        .unwrap();
    assert_eq!(stored.plan_id, harness.catalog.free.id);
}

#[tokio::test]
async fn selecting_current_plan_again_conflicts() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    let request = json!({
        "plan_id": harness.catalog.free.id,
        "billing_period": "monthly"
    });
    let url = format!("/v1/partners/{}/subscription", partner.id);

    harness
        .server
        .post(&url)
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&request)
        .await
        .assert_status_ok();

    harness
        .server
        .post(&url)
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&request)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn paid_plan_requires_payment() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    let response = harness
        .server
        .post(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "plan_id": harness.catalog.pro.id,
            "billing_period": "monthly"
        }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "payment_required");
    assert_eq!(body["error"]["details"]["plan_name"], "Pro Plan");
    assert!(harness
        .store
        .get_subscription(&partner.owner())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    let response = harness
        .server
        .post(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "plan_id": PlanId::generate(),
            "billing_period": "monthly"
        }))
        .await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn period_not_offered_is_rejected() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);

    harness
        .server
        .post(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "plan_id": harness.catalog.free.id,
            "billing_period": "yearly"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn controlled_organization_cannot_change_plan() {
    let harness = TestHarness::new().await;
    let org = harness.organization(true);

    harness
        .server
        .post(&format!("/v1/organizations/{}/subscription", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "plan_id": harness.catalog.free.id,
            "billing_period": "monthly"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn organization_partner_cannot_self_subscribe() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    let partner = harness.partner(Some(org.id));

    harness
        .server
        .post(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .json(&json!({
            "plan_id": harness.catalog.free.id,
            "billing_period": "monthly"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancel_paid_subscription_keeps_access_until_end() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    let subscription =
        Subscription::start(&harness.catalog.pro, BillingPeriod::Monthly, Utc::now()).unwrap();
    harness
        .store
        .replace_subscription(&partner.owner(), subscription)
        .unwrap();

    let response = harness
        .server
        .post(&format!("/v1/partners/{}/subscription/cancel", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan_name"], "Pro Plan");
    assert!(body["remaining_days"].as_i64().unwrap() >= 28);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Your Pro Plan subscription has been cancelled."));

    let response = harness
        .server
        .get(&format!("/v1/partners/{}/subscription", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["can_cancel"], false);
    assert_eq!(body["subscription"]["is_cancelled"], true);
}

#[tokio::test]
async fn cancelling_twice_conflicts() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    let subscription =
        Subscription::start(&harness.catalog.pro, BillingPeriod::Monthly, Utc::now()).unwrap();
    harness
        .store
        .replace_subscription(&org.owner(), subscription)
        .unwrap();
    let url = format!("/v1/organizations/{}/subscription/cancel", org.id);

    harness
        .server
        .post(&url)
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .await
        .assert_status_ok();

    harness
        .server
        .post(&url)
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn free_subscription_cannot_be_cancelled() {
    let harness = TestHarness::new().await;
    let partner = harness.partner(None);
    let subscription =
        Subscription::start(&harness.catalog.free, BillingPeriod::Monthly, Utc::now()).unwrap();
    harness
        .store
        .replace_subscription(&partner.owner(), subscription)
        .unwrap();

    harness
        .server
        .post(&format!("/v1/partners/{}/subscription/cancel", partner.id))
        .add_header(AUTHORIZATION, partner_auth(&partner))
        .await
        .assert_status(StatusCode::CONFLICT);
}

// ============================================================================
// Bulk Partner Assignment
// ============================================================================

#[tokio::test]
async fn organization_assigns_plan_to_all_partners() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    let first = harness.partner(Some(org.id));
    let second = harness.partner(Some(org.id));
    let independent = harness.partner(None);

    let response = harness
        .server
        .post(&format!("/v1/organizations/{}/partners/subscriptions", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "plan_id": harness.catalog.pro.id,
            "billing_period": "quarterly"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["assigned"], 2);
    assert_eq!(body["subscription"]["billing_period"], "quarterly");

    for partner in [&first, &second] {
        let sub = harness
            .store
            .get_subscription(&partner.owner())
            .unwrap()
            .unwrap();
        assert_eq!(sub.plan_id, harness.catalog.pro.id);
    }
    assert!(harness
        .store
        .get_subscription(&independent.owner())
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn bulk_assignment_requires_individual_period() {
    let harness = TestHarness::new().await;
    let org = harness.organization(false);
    harness.partner(Some(org.id));

    harness
        .server
        .post(&format!("/v1/organizations/{}/partners/subscriptions", org.id))
        .add_header(AUTHORIZATION, org_admin_auth(org.id))
        .json(&json!({
            "plan_id": harness.catalog.pro.id,
            "billing_period": "yearly"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
