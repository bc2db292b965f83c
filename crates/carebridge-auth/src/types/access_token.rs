//! Access token domain type.
//!
//! Access tokens are opaque bearer strings stored server-side; there is
//! no signed claim format. The token value is a bearer secret: it is
//! returned to the client, looked up by equality on validation, and
//! never written to logs in full.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::context::{DataAccessScope, HospitalRole};

/// Access token record stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Unique row identifier. Refresh tokens link back to this.
    pub id: Uuid,

    /// Opaque bearer token value. Never logged in full.
    pub token: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// User the token was issued for (None for client_credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Intended audience for this token.
    pub audience: String,

    /// Issuer of the token.
    pub issuer: String,

    /// Department context for the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,

    /// Hospital role of the authorizing user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_role: Option<HospitalRole>,

    /// Structured data-access scope for the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_access_scope: Option<DataAccessScope>,

    /// Idempotency key supplied at issuance, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Last successful validation (best-effort usage tracking).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_used_at: Option<OffsetDateTime>,
}

impl AccessToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Returns the PHI flag carried by this token's data-access scope.
    #[must_use]
    pub fn phi_access(&self) -> bool {
        self.data_access_scope
            .as_ref()
            .map(|s| s.phi_access)
            .unwrap_or(false)
    }

    /// Returns a short prefix of the token safe to include in logs.
    #[must_use]
    pub fn log_prefix(&self) -> &str {
        &self.token[..self.token.len().min(8)]
    }

    /// Generate a cryptographically secure opaque bearer token.
    ///
    /// Returns a 512-bit random value encoded as base64url (86 characters).
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 64];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes[..]);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
