//! Token endpoint types.
//!
//! Request parsing, response generation, and error handling for the
//! OAuth 2.0 token endpoint.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - exchange an authorization code for tokens
//! - `refresh_token` - rotate a refresh token into a fresh pair
//! - `client_credentials` - machine-to-machine authentication
//!
//! # Hospital Extensions
//!
//! Successful token responses echo the hospital context resolved at
//! authorization time: `hospital_role`, `department_id`, `phi_access`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::HospitalRole;

/// Token request parameters.
///
/// One structure handles all grant types; which fields are required
/// depends on `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, client_id,
///   client_secret (confidential) or code_verifier (public)
/// - `refresh_token`: refresh_token, client_id, client_secret
/// - `client_credentials`: client_id, client_secret, (optional) scope
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    pub grant_type: String,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match the authorization request exactly).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client ID.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (confidential clients).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope (for client_credentials grant).
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    /// The opaque bearer access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token (user-authorized grants only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Hospital role carried by the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_role: Option<HospitalRole>,

    /// Department context carried by the authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,

    /// Whether the token covers protected health information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phi_access: Option<bool>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope: None,
            refresh_token: None,
            hospital_role: None,
            department_id: None,
            phi_access: None,
        }
    }

    /// Sets the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the hospital role.
    #[must_use]
    pub fn with_hospital_role(mut self, role: HospitalRole) -> Self {
        self.hospital_role = Some(role);
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

/// Token error response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }

    /// Creates an `invalid_request` error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidRequest, description)
    }

    /// Creates an `invalid_client` error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidClient, description)
    }

    /// Creates an `invalid_grant` error.
    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidGrant, description)
    }

    /// Creates an `unauthorized_client` error.
    #[must_use]
    pub fn unauthorized_client(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::UnauthorizedClient, description)
    }

    /// Creates an `unsupported_grant_type` error.
    #[must_use]
    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::UnsupportedGrantType, description)
    }

    /// Creates an `invalid_scope` error.
    #[must_use]
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::with_description(TokenErrorCode::InvalidScope, description)
    }

    /// Creates a `server_error` without internal detail.
    #[must_use]
    pub fn server_error() -> Self {
        Self::new(TokenErrorCode::ServerError)
    }
}

/// OAuth 2.0 token error codes (RFC 6749 Section 5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a required parameter or is malformed.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The grant (code or refresh token) is invalid, expired, or revoked.
    InvalidGrant,

    /// The client is not authorized for this grant type.
    UnauthorizedClient,

    /// The grant type is not supported by this server.
    UnsupportedGrantType,

    /// The requested scope is invalid or exceeds the registered scopes.
    InvalidScope,

    /// An unexpected internal failure. No detail is exposed.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 500,
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::InvalidScope => 400,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
