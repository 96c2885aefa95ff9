//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `AuthUser` - Dashboard users authenticated via HS256 JWT
//! - `AdminAuth` - Platform administration via API key

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use theraptrack_core::{OrganizationId, PartnerId, SubscriptionOwner, UserId};

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Dashboard role carried in the JWT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Organization administrator.
    Organization,
    /// Therapist.
    Partner,
    /// Therapy client.
    Client,
}

/// JWT claims issued by the TheraPTrack auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Dashboard role.
    pub role: Role,
    /// Organization the user administers or belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    /// Partner record of a therapist user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<PartnerId>,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    pub iat: i64,
}

/// An authenticated dashboard user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// The user's role.
    pub role: Role,
    /// Organization from the token.
    pub organization_id: Option<OrganizationId>,
    /// Partner from the token.
    pub partner_id: Option<PartnerId>,
}

impl AuthUser {
    /// Require an administrator of `organization_id`.
    pub fn require_organization_admin(
        &self,
        organization_id: OrganizationId,
    ) -> Result<(), ApiError> {
        if self.role == Role::Organization && self.organization_id == Some(organization_id) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                organization_id = %organization_id,
                "Organization access denied"
            );
            Err(ApiError::Forbidden)
        }
    }

    /// Require the therapist `partner_id` themselves.
    pub fn require_partner(&self, partner_id: PartnerId) -> Result<(), ApiError> {
        if self.role == Role::Partner && self.partner_id == Some(partner_id) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                partner_id = %partner_id,
                "Partner access denied"
            );
            Err(ApiError::Forbidden)
        }
    }

    /// Require the user who manages `owner`'s subscription.
    pub fn require_owner(&self, owner: &SubscriptionOwner) -> Result<(), ApiError> {
        match owner {
            SubscriptionOwner::Organization(id) => self.require_organization_admin(*id),
            SubscriptionOwner::Partner(id) => self.require_partner(*id),
        }
    }
}

impl TryFrom<JwtClaims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self {
            user_id,
            role: claims.role,
            organization_id: claims.organization_id,
            partner_id: claims.partner_id,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let secret = state
            .config
            .jwt_secret
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;

        validate_jwt(token, secret, &state.config.jwt_issuer)?.try_into()
    }
}

/// Validate an HS256 token and return its claims.
pub fn validate_jwt(token: &str, secret: &str, issuer: &str) -> Result<JwtClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_aud = false;

    decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })
}

/// Admin authentication via API key.
///
/// Requires the `X-Admin-Key` header to match the configured admin key.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(admin_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(AdminAuth { admin_id })
    }
}
