//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use theraptrack_core::{
    Organization, OrganizationId, Partner, PartnerId, PaymentTransaction, PlanId,
    SubscriptionPlan,
};

use crate::error::{Result, StoreError};
use crate::{Mutation, Store};

#[derive(Default)]
struct Tables {
    plans: HashMap<PlanId, SubscriptionPlan>,
    organizations: HashMap<OrganizationId, Organization>,
    partners: HashMap<PartnerId, Partner>,
    payments: HashMap<String, PaymentTransaction>,
}

impl Tables {
    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutOrganization(org) => {
                self.organizations.insert(org.id, org);
            }
            Mutation::PutPartner(partner) => {
                self.partners.insert(partner.id, partner);
            }
            Mutation::PutPayment(tx) => {
                self.payments.insert(tx.order_id.clone(), tx);
            }
        }
    }
}

/// Process-local storage backed by hash maps.
///
/// Data is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    compound: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn put_plan(&self, plan: &SubscriptionPlan) -> Result<()> {
        self.write()?.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    fn get_plan(&self, plan_id: &PlanId) -> Result<Option<SubscriptionPlan>> {
        Ok(self.read()?.plans.get(plan_id).cloned())
    }

    fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let mut plans: Vec<_> = self.read()?.plans.values().cloned().collect();
        plans.sort_by_key(|plan| plan.created_at);
        Ok(plans)
    }

    fn put_organization(&self, organization: &Organization) -> Result<()> {
        self.write()?
            .apply(Mutation::PutOrganization(organization.clone()));
        Ok(())
    }

    fn get_organization(&self, organization_id: &OrganizationId) -> Result<Option<Organization>> {
        Ok(self.read()?.organizations.get(organization_id).cloned())
    }

    fn put_partner(&self, partner: &Partner) -> Result<()> {
        self.write()?.apply(Mutation::PutPartner(partner.clone()));
        Ok(())
    }

    fn get_partner(&self, partner_id: &PartnerId) -> Result<Option<Partner>> {
        Ok(self.read()?.partners.get(partner_id).cloned())
    }

    fn list_partners_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Partner>> {
        let mut partners: Vec<_> = self
            .read()?
            .partners
            .values()
            .filter(|partner| partner.organization_id.as_ref() == Some(organization_id))
            .cloned()
            .collect();
        partners.sort_by_key(|partner| partner.created_at);
        Ok(partners)
    }

    fn put_payment(&self, transaction: &PaymentTransaction) -> Result<()> {
        self.write()?.apply(Mutation::PutPayment(transaction.clone()));
        Ok(())
    }

    fn get_payment(&self, order_id: &str) -> Result<Option<PaymentTransaction>> {
        Ok(self.read()?.payments.get(order_id).cloned())
    }

    fn commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        let mut tables = self.write()?;
        for mutation in mutations {
            tables.apply(mutation);
        }
        Ok(())
    }

    fn compound_lock(&self) -> MutexGuard<'_, ()> {
        self.compound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
