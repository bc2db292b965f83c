//! Token introspection (RFC 7662).
//!
//! Allows resource servers to query token validity and claims from the
//! authorization server.
//!
//! # Security Considerations
//!
//! - The introspection endpoint requires client authentication
//! - Never reveal why a token is inactive (expired vs revoked vs unknown)
//! - Always return valid JSON

use serde::Serialize;

/// Token introspection response per RFC 7662.
///
/// If the token is invalid, expired, revoked, or unknown, the response
/// contains `active: false` and nothing else.
#[derive(Debug, Clone, Serialize, Default)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    ///
    /// Per RFC 7662, this is the only required field.
    pub active: bool,

    /// Space-separated scopes granted to the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Resource owner who authorized the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Token type ("Bearer").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject identifier (user or client ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Intended audience for this token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issuer of the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    // =========================================================================
    // Hospital Extensions
    // =========================================================================
    /// Hospital role carried by the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_role: Option<String>,

    /// Department context carried by the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,

    /// Whether the token covers protected health information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phi_access: Option<bool>,
}

impl IntrospectionResponse {
    /// Creates an inactive response.
    ///
    /// Per RFC 7662, no other field is populated: the caller must not
    /// learn why the token is inactive.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            ..Self::default()
        }
    }

    /// Creates an active response skeleton.
    #[must_use]
    pub fn active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub fn with_exp(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Sets the issued-at time.
    #[must_use]
    pub fn with_iat(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_aud(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_iss(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the hospital role.
    #[must_use]
    pub fn with_hospital_role(mut self, role: impl Into<String>) -> Self {
        self.hospital_role = Some(role.into());
        self
    }

    /// Sets the department context.
    #[must_use]
    pub fn with_department_id(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    /// Sets the PHI access flag.
    #[must_use]
    pub fn with_phi_access(mut self, phi_access: bool) -> Self {
        self.phi_access = Some(phi_access);
        self
    }
}
