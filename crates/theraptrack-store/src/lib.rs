//! Storage layer for TheraPTrack billing.
//!
//! This crate persists the plan catalog, organizations, partners (with their
//! subscriptions) and payment transactions.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local maps, used in tests and single-node
//!   development.
//! - `RocksStore` (feature `rocksdb-backend`): `RocksDB` column families with
//!   CBOR-encoded values.
//!
//! # Compound operations
//!
//! Backends only implement record-level reads/writes plus [`Store::commit`],
//! which applies several writes atomically. The billing operations that read,
//! check and rewrite several records (payment verification, cancellation, bulk
//! assignment) are provided methods that run under [`Store::compound_lock`], so
//! a gateway payment is applied to a subscription at most once.
//!
//! # Example
//!
//! ```
//! use theraptrack_core::{BillingPeriod, Organization, PlanTier, Subscription, SubscriptionPlan};
//! use theraptrack_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let org = Organization::new("Calm Minds", false);
//! store.put_organization(&org).unwrap();
//!
//! let free = SubscriptionPlan::new("Free Plan", PlanTier::Free);
//! let subscription = Subscription::start(&free, BillingPeriod::Monthly, chrono::Utc::now()).unwrap();
//! store.replace_subscription(&org.owner(), subscription).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
mod ops;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

use std::sync::MutexGuard;

use chrono::{DateTime, Utc};

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use ops::VerifiedPayment;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use theraptrack_core::{
    CancellationNotice, Organization, OrganizationId, Partner, PartnerId, PaymentTransaction,
    PlanId, Subscription, SubscriptionOwner, SubscriptionPlan,
};

/// A record write applied as part of [`Store::commit`].
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert or replace an organization.
    PutOrganization(Organization),
    /// Insert or replace a partner (and its organization index entry).
    PutPartner(Partner),
    /// Insert or replace a payment transaction.
    PutPayment(PaymentTransaction),
}

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Plan Catalog
    // =========================================================================

    /// Insert or update a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_plan(&self, plan: &SubscriptionPlan) -> Result<()>;

    /// Get a plan by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_plan(&self, plan_id: &PlanId) -> Result<Option<SubscriptionPlan>>;

    /// List every plan, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_plans(&self) -> Result<Vec<SubscriptionPlan>>;

    // =========================================================================
    // Organizations and Partners
    // =========================================================================

    /// Insert or update an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_organization(&self, organization: &Organization) -> Result<()>;

    /// Get an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_organization(&self, organization_id: &OrganizationId) -> Result<Option<Organization>>;

    /// Insert or update a partner, maintaining the organization index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_partner(&self, partner: &Partner) -> Result<()>;

    /// Get a partner by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_partner(&self, partner_id: &PartnerId) -> Result<Option<Partner>>;

    /// List the partners of an organization, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_partners_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Partner>>;

    // =========================================================================
    // Payments
    // =========================================================================

    /// Insert or update a payment transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_payment(&self, transaction: &PaymentTransaction) -> Result<()>;

    /// Get a payment transaction by gateway order ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_payment(&self, order_id: &str) -> Result<Option<PaymentTransaction>>;

    // =========================================================================
    // Atomicity
    // =========================================================================

    /// Apply all mutations atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no mutation is applied.
    fn commit(&self, mutations: Vec<Mutation>) -> Result<()>;

    /// Serialize read-check-write operations.
    fn compound_lock(&self) -> MutexGuard<'_, ()>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Current subscription of an owner.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the owner doesn't exist.
    fn get_subscription(&self, owner: &SubscriptionOwner) -> Result<Option<Subscription>> {
        ops::get_subscription(self, owner)
    }

    /// Replace an owner's subscription, returning the previous one.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the owner doesn't exist.
    fn replace_subscription(
        &self,
        owner: &SubscriptionOwner,
        subscription: Subscription,
    ) -> Result<Option<Subscription>> {
        ops::replace_subscription(self, owner, subscription)
    }

    /// Cancel an owner's subscription at `now`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the owner doesn't exist.
    /// - `StoreError::Billing` if there is no cancellable subscription.
    fn cancel_subscription(
        &self,
        owner: &SubscriptionOwner,
        now: DateTime<Utc>,
    ) -> Result<CancellationNotice> {
        ops::cancel_subscription(self, owner, now)
    }

    /// Give every partner of an organization the same subscription. Returns the
    /// number of partners updated.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the organization doesn't exist.
    fn assign_partner_subscriptions(
        &self,
        organization_id: &OrganizationId,
        subscription: &Subscription,
    ) -> Result<usize> {
        ops::assign_partner_subscriptions(self, organization_id, subscription)
    }

    /// Mark an order paid and apply its subscription, at most once per order.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the order, owner or plan doesn't exist.
    /// - `StoreError::Billing` if the order was paid by a different payment.
    fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedPayment> {
        ops::verify_payment(self, order_id, payment_id, signature, now)
    }

    /// Record a failed payment attempt for an order.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the order doesn't exist.
    fn record_payment_failure(
        &self,
        order_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentTransaction> {
        ops::record_payment_failure(self, order_id, reason, now)
    }
}
