//! Organizations and partners that own subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscription::{Subscription, SubscriptionOwner, SubscriptionStatus};
use crate::{OrganizationId, PartnerId};

/// A tenant grouping partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization ID.
    pub id: OrganizationId,

    /// Display name.
    pub name: String,

    /// When true the platform manages this organization's billing tier and its
    /// admins cannot change the organization subscription themselves.
    #[serde(default)]
    pub theraptrack_controlled: bool,

    /// Current subscription, if any.
    #[serde(default)]
    pub subscription: Option<Subscription>,

    /// When the organization was created.
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create an organization without a subscription.
    #[must_use]
    pub fn new(name: impl Into<String>, theraptrack_controlled: bool) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::generate(),
            name: name.into(),
            theraptrack_controlled,
            subscription: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner key for this organization's subscription.
    #[must_use]
    pub const fn owner(&self) -> SubscriptionOwner {
        SubscriptionOwner::Organization(self.id)
    }

    /// Derived subscription status at `now`.
    #[must_use]
    pub fn subscription_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        crate::valuation::subscription_status(self.subscription.as_ref(), now)
    }
}

/// A therapist account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    /// Partner ID.
    pub id: PartnerId,

    /// Organization the partner belongs to, if any.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,

    /// Display name.
    pub name: String,

    /// Contact email, prefilled into checkout.
    pub email: String,

    /// Contact phone, prefilled into checkout.
    #[serde(default)]
    pub contact: Option<String>,

    /// Current subscription, if any.
    #[serde(default)]
    pub subscription: Option<Subscription>,

    /// When the partner was created.
    pub created_at: DateTime<Utc>,

    /// When the partner was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Partner {
    /// Create a partner without a subscription.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        organization_id: Option<OrganizationId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PartnerId::generate(),
            organization_id,
            name: name.into(),
            email: email.into(),
            contact: None,
            subscription: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner key for this partner's subscription.
    #[must_use]
    pub const fn owner(&self) -> SubscriptionOwner {
        SubscriptionOwner::Partner(self.id)
    }

    /// Whether the partner pays for themselves rather than through an organization.
    #[must_use]
    pub const fn is_independent(&self) -> bool {
        self.organization_id.is_none()
    }

    /// Derived subscription status at `now`.
    #[must_use]
    pub fn subscription_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        crate::valuation::subscription_status(self.subscription.as_ref(), now)
    }
}
