//! Plan purchase orchestration tests against a mocked billing API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use theraptrack_client::{
    BuyerDetails, Checkout, CheckoutError, CheckoutOutcome, CheckoutRequest, ClientError,
    PlanPurchase, PurchaseError, TheraPTrackClient,
};
use theraptrack_core::{
    BillingError, BillingPeriod, PartnerId, PaymentVerification, PeriodPricing, PlanTier,
    ReceiptId, Subscription, SubscriptionOwner, SubscriptionPlan, UserType,
};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct FakeCheckout {
    dismiss: bool,
    paid_order_id: Option<&'static str>,
    loads: AtomicUsize,
    opened: Mutex<Vec<CheckoutRequest>>,
}

impl FakeCheckout {
    fn paying() -> Self {
        Self::default()
    }

    fn dismissing() -> Self {
        Self {
            dismiss: true,
            ..Self::default()
        }
    }

    fn paying_for(order_id: &'static str) -> Self {
        Self {
            paid_order_id: Some(order_id),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Checkout for FakeCheckout {
    async fn load(&self) -> Result<(), CheckoutError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError> {
        let order_id = self
            .paid_order_id
            .map_or_else(|| request.order_id.clone(), str::to_string);
        self.opened.lock().unwrap().push(request);
        if self.dismiss {
            return Ok(CheckoutOutcome::Dismissed);
        }
        Ok(CheckoutOutcome::Completed(PaymentVerification {
            razorpay_order_id: order_id,
            razorpay_payment_id: "pay_1".into(),
            razorpay_signature: "sig_1".into(),
        }))
    }
}

struct Fixture {
    server: MockServer,
    partner_id: PartnerId,
    free: SubscriptionPlan,
    pro: SubscriptionPlan,
}

impl Fixture {
    async fn new() -> Self {
        let free = SubscriptionPlan::new("Free Plan", PlanTier::Free).with_price(
            UserType::Individual,
            BillingPeriod::Monthly,
            PeriodPricing::enabled(0),
        );
        let pro = SubscriptionPlan::new("Pro Plan", PlanTier::Paid).with_price(
            UserType::Individual,
            BillingPeriod::Monthly,
            PeriodPricing::enabled(89_900),
        );

        Self {
            server: MockServer::start().await,
            partner_id: PartnerId::generate(),
            free,
            pro,
        }
    }

    fn owner(&self) -> SubscriptionOwner {
        SubscriptionOwner::Partner(self.partner_id)
    }

    fn subscription_path(&self) -> String {
        format!("/v1/partners/{}/subscription", self.partner_id)
    }

    fn purchase<C: Checkout>(&self, checkout: C) -> PlanPurchase<C> {
        let client = TheraPTrackClient::new(self.server.uri(), "user-jwt").unwrap();
        PlanPurchase::new(
            client,
            checkout,
            self.owner(),
            BuyerDetails {
                name: "Asha Rao".into(),
                email: "asha@example.com".into(),
                contact: Some("+919800000000".into()),
            },
        )
    }

    fn subscription_body(&self, current: Option<&SubscriptionPlan>) -> Value {
        let subscription = current.map(|plan| {
            Subscription::start(plan, BillingPeriod::Monthly, Utc::now()).unwrap()
        });
        json!({
            "owner": self.owner(),
            "status": if subscription.is_some() { "active" } else { "none" },
            "subscription": subscription,
            "plan": current,
            "can_cancel": false,
            "has_upgradeable_plans": true,
            "selection_action": if current.is_some() { "upgrade" } else { "select" },
            "selection_label": if current.is_some() { "Upgrade Plan" } else { "Select Plan" }
        })
    }

    /// First GET returns `before`, later GETs return `after`.
    async fn mock_subscription(
        &self,
        before: Option<&SubscriptionPlan>,
        after: Option<&SubscriptionPlan>,
    ) {
        Mock::given(method("GET"))
            .and(path(self.subscription_path()))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.subscription_body(before)))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(self.subscription_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.subscription_body(after)))
            .mount(&self.server)
            .await;
    }

    async fn mock_order(&self, order_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/payments/orders"))
            .and(body_partial_json(json!({
                "owner": self.owner(),
                "plan_id": self.pro.id,
                "billing_period": "monthly"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "order_id": order_id,
                "key_id": "rzp_test_key",
                "amount_paise": 89_900,
                "currency": "INR",
                "receipt": ReceiptId::generate(),
                "plan_id": self.pro.id,
                "plan_name": "Pro Plan",
                "billing_period": "monthly"
            })))
            .mount(&self.server)
            .await;
    }
}

// ============================================================================
// Paid Plans
// ============================================================================

#[tokio::test]
async fn paid_purchase_verifies_and_refetches() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, Some(&fixture.pro)).await;
    fixture.mock_order("order_1").await;

    Mock::given(method("POST"))
        .and(path("/v1/payments/verify"))
        .and(body_partial_json(json!({
            "razorpay_order_id": "order_1",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "sig_1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "order_id": "order_1",
            "payment_id": "pay_1",
            "status": "verified",
            "already_verified": false,
            "subscription": null
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let purchase = fixture.purchase(FakeCheckout::paying());
    let subscription = purchase
        .purchase(&fixture.pro, BillingPeriod::Monthly)
        .await
        .unwrap();

    assert_eq!(subscription.subscription.unwrap().plan_id, fixture.pro.id);
}

#[tokio::test]
async fn checkout_is_prefilled_and_loaded_once() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, None).await;
    fixture.mock_order("order_2").await;

    let purchase = fixture.purchase(FakeCheckout::dismissing());
    for _ in 0..2 {
        let err = purchase
            .purchase(&fixture.pro, BillingPeriod::Monthly)
            .await
            .unwrap_err();
        assert!(err.is_user_cancelled());
    }

    let checkout = purchase.checkout();
    assert_eq!(checkout.loads.load(Ordering::SeqCst), 1);

    let opened = checkout.opened.lock().unwrap();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].order_id, "order_2");
    assert_eq!(opened[0].amount_paise, 89_900);
    assert_eq!(opened[0].key_id, "rzp_test_key");
    assert_eq!(opened[0].prefill.email, "asha@example.com");
    assert_eq!(opened[0].prefill.contact.as_deref(), Some("+919800000000"));
}

#[tokio::test]
async fn dismissed_checkout_never_verifies() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, None).await;
    fixture.mock_order("order_3").await;

    Mock::given(method("POST"))
        .and(path("/v1/payments/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let err = fixture
        .purchase(FakeCheckout::dismissing())
        .purchase(&fixture.pro, BillingPeriod::Monthly)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::UserCancelled { ref order_id } if order_id == "order_3"
    ));
}

#[tokio::test]
async fn verification_failure_carries_ids() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, None).await;
    fixture.mock_order("order_4").await;

    Mock::given(method("POST"))
        .and(path("/v1/payments/verify"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "verification_failed",
                "message": "Payment verification failed. Please contact support.",
                "details": { "order_id": "order_4", "payment_id": "pay_1" }
            }
        })))
        .mount(&fixture.server)
        .await;

    let err = fixture
        .purchase(FakeCheckout::paying())
        .purchase(&fixture.pro, BillingPeriod::Monthly)
        .await
        .unwrap_err();

    match err {
        PurchaseError::VerificationFailed {
            order_id,
            payment_id,
        } => {
            assert_eq!(order_id, "order_4");
            assert_eq!(payment_id, "pay_1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn payment_for_another_order_needs_support() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, None).await;
    fixture.mock_order("order_5").await;

    Mock::given(method("POST"))
        .and(path("/v1/payments/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let err = fixture
        .purchase(FakeCheckout::paying_for("order_stale"))
        .purchase(&fixture.pro, BillingPeriod::Monthly)
        .await
        .unwrap_err();

    match err {
        PurchaseError::VerificationFailed {
            order_id,
            payment_id,
        } => {
            assert_eq!(order_id, "order_stale");
            assert_eq!(payment_id, "pay_1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Free Plans and Local Checks
// ============================================================================

#[tokio::test]
async fn free_plan_skips_checkout() {
    let fixture = Fixture::new().await;
    fixture.mock_subscription(None, Some(&fixture.free)).await;

    Mock::given(method("POST"))
        .and(path(fixture.subscription_path()))
        .and(body_partial_json(json!({
            "plan_id": fixture.free.id,
            "billing_period": "monthly"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixture.subscription_body(Some(&fixture.free))),
        )
        .expect(1)
        .mount(&fixture.server)
        .await;

    let purchase = fixture.purchase(FakeCheckout::paying());
    let subscription = purchase
        .purchase(&fixture.free, BillingPeriod::Monthly)
        .await
        .unwrap();

    assert_eq!(subscription.plan.unwrap().plan_name, "Free Plan");
    assert_eq!(purchase.checkout().loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn current_plan_is_rejected_locally() {
    let fixture = Fixture::new().await;
    fixture
        .mock_subscription(Some(&fixture.pro), Some(&fixture.pro))
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/payments/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&fixture.server)
        .await;

    let err = fixture
        .purchase(FakeCheckout::paying())
        .purchase(&fixture.pro, BillingPeriod::Monthly)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::Billing(BillingError::SameAsCurrent { .. })
    ));
}

#[tokio::test]
async fn paid_plan_selection_maps_to_payment_required() {
    let fixture = Fixture::new().await;

    Mock::given(method("POST"))
        .and(path(fixture.subscription_path()))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "code": "payment_required",
                "message": "payment required for plan Pro Plan",
                "details": { "plan_name": "Pro Plan" }
            }
        })))
        .mount(&fixture.server)
        .await;

    let client = TheraPTrackClient::new(fixture.server.uri(), "user-jwt").unwrap();
    let err = client
        .select_plan(&fixture.owner(), fixture.pro.id, BillingPeriod::Monthly)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::PaymentRequired { ref plan_name } if plan_name == "Pro Plan"
    ));
}
