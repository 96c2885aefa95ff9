//! Read-check-write operations shared by every backend.

use chrono::{DateTime, Utc};

use theraptrack_core::{
    BillingError, CancellationNotice, Organization, OrganizationId, Partner, PaymentTransaction,
    Subscription, SubscriptionOwner, SubscriptionStatus, VerifyOutcome,
};

use crate::error::{Result, StoreError};
use crate::{Mutation, Store};

/// Outcome of [`Store::verify_payment`].
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// The transaction after verification.
    pub transaction: PaymentTransaction,
    /// Whether this call applied the subscription.
    pub outcome: VerifyOutcome,
    /// The owner's subscription after the call.
    pub subscription: Option<Subscription>,
}

enum OwnerRecord {
    Organization(Organization),
    Partner(Partner),
}

impl OwnerRecord {
    fn load<S: Store + ?Sized>(store: &S, owner: &SubscriptionOwner) -> Result<Self> {
        match owner {
            SubscriptionOwner::Organization(id) => store
                .get_organization(id)?
                .map(Self::Organization)
                .ok_or_else(|| StoreError::not_found("organization", id)),
            SubscriptionOwner::Partner(id) => store
                .get_partner(id)?
                .map(Self::Partner)
                .ok_or_else(|| StoreError::not_found("partner", id)),
        }
    }

    fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Organization(org) => org.subscription.as_ref(),
            Self::Partner(partner) => partner.subscription.as_ref(),
        }
    }

    fn subscription_mut(&mut self, now: DateTime<Utc>) -> &mut Option<Subscription> {
        match self {
            Self::Organization(org) => {
                org.updated_at = now;
                &mut org.subscription
            }
            Self::Partner(partner) => {
                partner.updated_at = now;
                &mut partner.subscription
            }
        }
    }

    fn into_mutation(self) -> Mutation {
        match self {
            Self::Organization(org) => Mutation::PutOrganization(org),
            Self::Partner(partner) => Mutation::PutPartner(partner),
        }
    }
}

pub(crate) fn get_subscription<S: Store + ?Sized>(
    store: &S,
    owner: &SubscriptionOwner,
) -> Result<Option<Subscription>> {
    Ok(OwnerRecord::load(store, owner)?.subscription().cloned())
}

pub(crate) fn replace_subscription<S: Store + ?Sized>(
    store: &S,
    owner: &SubscriptionOwner,
    subscription: Subscription,
) -> Result<Option<Subscription>> {
    let _guard = store.compound_lock();

    let mut record = OwnerRecord::load(store, owner)?;
    let previous = record
        .subscription_mut(subscription.subscription_start_date)
        .replace(subscription);
    store.commit(vec![record.into_mutation()])?;

    Ok(previous)
}

pub(crate) fn cancel_subscription<S: Store + ?Sized>(
    store: &S,
    owner: &SubscriptionOwner,
    now: DateTime<Utc>,
) -> Result<CancellationNotice> {
    let _guard = store.compound_lock();

    let mut record = OwnerRecord::load(store, owner)?;
    let notice = record
        .subscription_mut(now)
        .as_mut()
        .ok_or(BillingError::NotCancellable {
            status: SubscriptionStatus::None,
        })?
        .cancel(now)?;
    store.commit(vec![record.into_mutation()])?;

    Ok(notice)
}

pub(crate) fn assign_partner_subscriptions<S: Store + ?Sized>(
    store: &S,
    organization_id: &OrganizationId,
    subscription: &Subscription,
) -> Result<usize> {
    let _guard = store.compound_lock();

    if store.get_organization(organization_id)?.is_none() {
        return Err(StoreError::not_found("organization", organization_id));
    }

    let now = subscription.subscription_start_date;
    let mutations: Vec<_> = store
        .list_partners_by_organization(organization_id)?
        .into_iter()
        .map(|mut partner| {
            partner.subscription = Some(subscription.clone());
            partner.updated_at = now;
            Mutation::PutPartner(partner)
        })
        .collect();

    let count = mutations.len();
    store.commit(mutations)?;

    Ok(count)
}

pub(crate) fn verify_payment<S: Store + ?Sized>(
    store: &S,
    order_id: &str,
    payment_id: &str,
    signature: Option<&str>,
    now: DateTime<Utc>,
) -> Result<VerifiedPayment> {
    let _guard = store.compound_lock();

    let mut transaction = store
        .get_payment(order_id)?
        .ok_or_else(|| StoreError::not_found("payment", order_id))?;
    let outcome = transaction.mark_verified(payment_id, signature, now)?;
    let mut record = OwnerRecord::load(store, &transaction.owner)?;

    if outcome == VerifyOutcome::AlreadyVerified {
        return Ok(VerifiedPayment {
            subscription: record.subscription().cloned(),
            transaction,
            outcome,
        });
    }

    let plan = store
        .get_plan(&transaction.plan_id)?
        .ok_or_else(|| StoreError::not_found("plan", transaction.plan_id))?;
    let subscription = Subscription::start(&plan, transaction.billing_period, now)?
        .with_payment(order_id, payment_id);
    *record.subscription_mut(now) = Some(subscription.clone());

    store.commit(vec![
        Mutation::PutPayment(transaction.clone()),
        record.into_mutation(),
    ])?;

    Ok(VerifiedPayment {
        transaction,
        outcome,
        subscription: Some(subscription),
    })
}

pub(crate) fn record_payment_failure<S: Store + ?Sized>(
    store: &S,
    order_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<PaymentTransaction> {
    let _guard = store.compound_lock();

    let mut transaction = store
        .get_payment(order_id)?
        .ok_or_else(|| StoreError::not_found("payment", order_id))?;
    transaction.mark_failed(reason, now);
    store.put_payment(&transaction)?;

    Ok(transaction)
}
