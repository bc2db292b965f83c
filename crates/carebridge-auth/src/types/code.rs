//! Authorization code domain type.
//!
//! An authorization code tracks the state of one OAuth 2.0 authorization
//! from issuance through redemption at the token endpoint.
//!
//! # Lifecycle
//!
//! 1. Code created when the authorization request is validated
//! 2. Client exchanges the code for tokens (code consumed)
//! 3. Expired, unconsumed codes are purged by the cleanup sweep
//!
//! # Security
//!
//! - Codes are cryptographically random (256 bits)
//! - Codes expire after a short time (default 10 minutes)
//! - Codes are single-use; consumption is an atomic compare-and-set
//! - The PKCE challenge is stored for verification at redemption

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::context::{DataAccessScope, HospitalRole};

/// Authorization code stored in the database.
///
/// Carries everything needed to validate the token request and mint
/// tokens with the right hospital context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Unique row identifier.
    pub id: Uuid,

    /// Authorization code value (one-time use).
    /// 256-bit random value, base64url-encoded.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// User who approved the authorization.
    pub user_id: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Redirect URI from the authorization request.
    /// Must match the redirect_uri in the token request exactly.
    pub redirect_uri: String,

    /// PKCE code challenge (base64url SHA-256 of the verifier).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method (always "S256" when present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

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

    /// When the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the code was redeemed (None until used).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Generates a new cryptographically secure authorization code.
    ///
    /// The code is 256 bits (32 bytes) of random data, encoded as
    /// base64url without padding (43 characters).
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the code has already been redeemed.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the code can still be redeemed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_code(
        expires_at: OffsetDateTime,
        consumed_at: Option<OffsetDateTime>,
    ) -> AuthorizationCode {
        let now = OffsetDateTime::now_utc();
        AuthorizationCode {
            id: Uuid::new_v4(),
            code: AuthorizationCode::generate_code(),
            client_id: "hos_abc".to_string(),
            organization_id: "org-1".to_string(),
            user_id: "u1".to_string(),
            scope: "read patient:read".to_string(),
            redirect_uri: "https://emr.test/cb".to_string(),
            code_challenge: None,
            code_challenge_method: None,
            department_id: Some("cardiology".to_string()),
            hospital_role: Some(HospitalRole::Doctor),
            data_access_scope: None,
            idempotency_key: None,
            created_at: now,
            expires_at,
            consumed_at,
        }
    }

    #[test]
    fn test_generate_code_length() {
        let code = AuthorizationCode::generate_code();
        // 32 bytes = 256 bits, base64url encoded = 43 characters (no padding)
        assert_eq!(code.len(), 43);
    }

    #[test]
    fn test_generate_code_is_base64url() {
        let code = AuthorizationCode::generate_code();
        assert!(
            code.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_code_uniqueness() {
        let codes: Vec<String> = (0..100)
            .map(|_| AuthorizationCode::generate_code())
            .collect();
        let mut unique = codes.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(codes.len(), unique.len());
    }

    #[test]
    fn test_is_expired() {
        let now = OffsetDateTime::now_utc();
        assert!(!make_code(now + Duration::minutes(10), None).is_expired());
        assert!(make_code(now - Duration::minutes(1), None).is_expired());
    }

    #[test]
    fn test_is_consumed() {
        let now = OffsetDateTime::now_utc();
        assert!(!make_code(now + Duration::minutes(10), None).is_consumed());
        assert!(make_code(now + Duration::minutes(10), Some(now)).is_consumed());
    }

    #[test]
    fn test_is_valid() {
        let now = OffsetDateTime::now_utc();
        assert!(make_code(now + Duration::minutes(10), None).is_valid());
        assert!(!make_code(now - Duration::minutes(1), None).is_valid());
        assert!(!make_code(now + Duration::minutes(10), Some(now)).is_valid());
    }

    #[test]
    fn test_serde_roundtrip() {
        let code = make_code(OffsetDateTime::now_utc() + Duration::minutes(10), None);
        let json = serde_json::to_string(&code).unwrap();
        let parsed: AuthorizationCode = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.code, code.code);
        assert_eq!(parsed.client_id, code.client_id);
        assert_eq!(parsed.hospital_role, Some(HospitalRole::Doctor));
        assert_eq!(parsed.redirect_uri, code.redirect_uri);
    }
}
