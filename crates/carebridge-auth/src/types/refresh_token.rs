//! Refresh token domain type.
//!
//! Refresh tokens allow clients to obtain new access tokens without user
//! re-authentication. They rotate on use: a successful refresh revokes
//! the presented token and its paired access token, then mints a new pair.
//!
//! # Security
//!
//! - Refresh tokens are opaque bearer secrets, never logged in full
//! - Only issued for user-authorized grants (never client_credentials)
//! - Each token links to the access token it was issued with

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::access_token::AccessToken;
use crate::types::context::{DataAccessScope, HospitalRole};

/// Refresh token record stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique row identifier.
    pub id: Uuid,

    /// Opaque token value. Never logged in full.
    pub token: String,

    /// Access token this refresh token was issued alongside.
    /// Revoked together during rotation.
    pub access_token_id: Uuid,

    /// Client the token was issued to.
    pub client_id: String,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// User the token was issued for. Always present: refresh tokens are
    /// never issued without an end user.
    pub user_id: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Department context preserved from the original authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,

    /// Hospital role preserved from the original authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_role: Option<HospitalRole>,

    /// Data-access scope preserved from the original authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_access_scope: Option<DataAccessScope>,

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
}

impl RefreshToken {
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

    /// Generate a cryptographically secure opaque refresh token.
    #[must_use]
    pub fn generate_token() -> String {
        AccessToken::generate_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_token(
        expires_at: OffsetDateTime,
        revoked_at: Option<OffsetDateTime>,
    ) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token: RefreshToken::generate_token(),
            access_token_id: Uuid::new_v4(),
            client_id: "hos_abc".to_string(),
            organization_id: "org-1".to_string(),
            user_id: "u1".to_string(),
            scope: "read".to_string(),
            department_id: None,
            hospital_role: None,
            data_access_scope: None,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_validity() {
        let now = OffsetDateTime::now_utc();

        assert!(make_token(now + Duration::hours(24), None).is_valid());
        assert!(!make_token(now - Duration::minutes(1), None).is_valid());
        assert!(!make_token(now + Duration::hours(24), Some(now)).is_valid());
    }

    #[test]
    fn test_serde_roundtrip() {
        let token = make_token(OffsetDateTime::now_utc() + Duration::hours(24), None);
        let json = serde_json::to_string(&token).unwrap();
        let parsed: RefreshToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.token, token.token);
        assert_eq!(parsed.access_token_id, token.access_token_id);
        assert_eq!(parsed.user_id, token.user_id);
    }
}
