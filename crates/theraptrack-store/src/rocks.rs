//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use theraptrack_core::{
    Organization, OrganizationId, Partner, PartnerId, PaymentTransaction, PlanId,
    SubscriptionPlan,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Mutation, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    compound: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            compound: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_values<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Self::deserialize(&value)
            })
            .collect()
    }

    /// Add a write to `batch`, keeping the partner index in step when a
    /// partner moves between organizations.
    fn stage(&self, batch: &mut WriteBatch, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::PutOrganization(org) => {
                let cf = self.cf(cf::ORGANIZATIONS)?;
                batch.put_cf(&cf, keys::organization_key(&org.id), Self::serialize(org)?);
            }
            Mutation::PutPartner(partner) => {
                let cf_partners = self.cf(cf::PARTNERS)?;
                let cf_index = self.cf(cf::PARTNERS_BY_ORGANIZATION)?;

                let previous_org = self
                    .get_partner(&partner.id)?
                    .and_then(|existing| existing.organization_id);
                if let Some(previous_org) = previous_org {
                    if partner.organization_id != Some(previous_org) {
                        batch.delete_cf(
                            &cf_index,
                            keys::organization_partner_key(&previous_org, &partner.id),
                        );
                    }
                }
                if let Some(org_id) = partner.organization_id {
                    batch.put_cf(
                        &cf_index,
                        keys::organization_partner_key(&org_id, &partner.id),
                        [],
                    );
                }
                batch.put_cf(
                    &cf_partners,
                    keys::partner_key(&partner.id),
                    Self::serialize(partner)?,
                );
            }
            Mutation::PutPayment(tx) => {
                let cf = self.cf(cf::PAYMENTS)?;
                batch.put_cf(&cf, keys::payment_key(&tx.order_id), Self::serialize(tx)?);
            }
        }
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Plan Catalog
    // =========================================================================

    fn put_plan(&self, plan: &SubscriptionPlan) -> Result<()> {
        let cf = self.cf(cf::PLANS)?;
        let value = Self::serialize(plan)?;

        self.db
            .put_cf(&cf, keys::plan_key(&plan.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_plan(&self, plan_id: &PlanId) -> Result<Option<SubscriptionPlan>> {
        self.get_value(cf::PLANS, &keys::plan_key(plan_id))
    }

    fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let mut plans: Vec<SubscriptionPlan> = self.list_values(cf::PLANS)?;
        plans.sort_by_key(|plan| plan.created_at);
        Ok(plans)
    }

    // =========================================================================
    // Organizations and Partners
    // =========================================================================

    fn put_organization(&self, organization: &Organization) -> Result<()> {
        self.commit(vec![Mutation::PutOrganization(organization.clone())])
    }

    fn get_organization(&self, organization_id: &OrganizationId) -> Result<Option<Organization>> {
        self.get_value(cf::ORGANIZATIONS, &keys::organization_key(organization_id))
    }

    fn put_partner(&self, partner: &Partner) -> Result<()> {
        self.commit(vec![Mutation::PutPartner(partner.clone())])
    }

    fn get_partner(&self, partner_id: &PartnerId) -> Result<Option<Partner>> {
        self.get_value(cf::PARTNERS, &keys::partner_key(partner_id))
    }

    fn list_partners_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Partner>> {
        let cf_index = self.cf(cf::PARTNERS_BY_ORGANIZATION)?;
        let prefix = keys::organization_partners_prefix(organization_id);

        let iter = self
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        let mut partners = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let partner_id = keys::extract_partner_id(&key)?;
            if let Some(partner) = self.get_partner(&partner_id)? {
                partners.push(partner);
            }
        }

        partners.sort_by_key(|partner| partner.created_at);
        Ok(partners)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    fn put_payment(&self, transaction: &PaymentTransaction) -> Result<()> {
        self.commit(vec![Mutation::PutPayment(transaction.clone())])
    }

    fn get_payment(&self, order_id: &str) -> Result<Option<PaymentTransaction>> {
        self.get_value(cf::PAYMENTS, &keys::payment_key(order_id))
    }

    // =========================================================================
    // Atomicity
    // =========================================================================

    fn commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for mutation in &mutations {
            self.stage(&mut batch, mutation)?;
        }
        self.write(batch)
    }

    fn compound_lock(&self) -> MutexGuard<'_, ()> {
        self.compound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
