//! Key encoding for the column families in [`crate::schema`].

use theraptrack_core::{OrganizationId, PartnerId, PlanId};

use crate::error::{Result, StoreError};

/// Length of an organization-partner index key.
pub const PARTNER_INDEX_KEY_LEN: usize = 32;

/// Create a plan key from a plan ID.
#[must_use]
pub fn plan_key(plan_id: &PlanId) -> Vec<u8> {
    plan_id.as_bytes().to_vec()
}

/// Create an organization key from an organization ID.
#[must_use]
pub fn organization_key(organization_id: &OrganizationId) -> Vec<u8> {
    organization_id.as_bytes().to_vec()
}

/// Create a partner key from a partner ID.
#[must_use]
pub fn partner_key(partner_id: &PartnerId) -> Vec<u8> {
    partner_id.as_bytes().to_vec()
}

/// Create an organization-partner index key.
///
/// Format: `organization_id (16 bytes) || partner_id (16 bytes)`
#[must_use]
pub fn organization_partner_key(
    organization_id: &OrganizationId,
    partner_id: &PartnerId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(PARTNER_INDEX_KEY_LEN);
    key.extend_from_slice(organization_id.as_bytes());
    key.extend_from_slice(partner_id.as_bytes());
    key
}

/// Create a prefix for iterating the partners of an organization.
#[must_use]
pub fn organization_partners_prefix(organization_id: &OrganizationId) -> Vec<u8> {
    organization_id.as_bytes().to_vec()
}

/// Extract the partner ID from an organization-partner index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key has the wrong length.
pub fn extract_partner_id(key: &[u8]) -> Result<PartnerId> {
    let bytes: [u8; 16] = key
        .get(16..PARTNER_INDEX_KEY_LEN)
        .filter(|_| key.len() == PARTNER_INDEX_KEY_LEN)
        .and_then(|tail| tail.try_into().ok())
        .ok_or_else(|| {
            StoreError::Database(format!("malformed partner index key ({} bytes)", key.len()))
        })?;
    Ok(PartnerId::from_bytes(bytes))
}

/// Create a payment key from a gateway order ID.
#[must_use]
pub fn payment_key(order_id: &str) -> Vec<u8> {
    order_id.as_bytes().to_vec()
}
