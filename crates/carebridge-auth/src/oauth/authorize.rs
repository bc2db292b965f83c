//! Authorization endpoint types.
//!
//! This module provides types for the OAuth 2.0 authorization endpoint:
//! request parsing, redirect construction, and error responses.
//!
//! # Hospital Extensions
//!
//! Beyond the standard RFC 6749 parameters, authorization requests carry:
//! - `department_id`: hospital department context
//! - `hospital_role`: job function of the authorizing user
//! - `data_access_scope`: URL-encoded JSON describing PHI/audit intent
//!
//! # Error Delivery
//!
//! Failures discovered before the redirect URI is validated return a
//! structured JSON error (redirecting to an unverified URI would be an
//! open redirect). Failures discovered after produce a redirect carrying
//! the error, with the caller's `state` preserved unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization request parameters.
///
/// Received as query string parameters on the authorization endpoint.
/// Presence of the required parameters is checked by the authorization
/// server rather than the deserializer so that missing values map to
/// proper `invalid_request` errors instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code" for the authorization code flow.
    #[serde(default)]
    pub response_type: Option<String>,

    /// Client identifier issued during registration.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Redirect URI where the response will be sent.
    /// Must exactly match one of the registered redirect URIs.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Requested scopes (space-separated).
    #[serde(default)]
    pub scope: Option<String>,

    /// CSRF protection state parameter, echoed back unchanged.
    #[serde(default)]
    pub state: Option<String>,

    /// PKCE code challenge (base64url SHA-256 of the verifier).
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method. Must be "S256" when present.
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// Hospital department the authorization is scoped to.
    #[serde(default)]
    pub department_id: Option<String>,

    /// Hospital role of the authorizing user.
    /// One of: administrator, doctor, nurse, technician, viewer.
    #[serde(default)]
    pub hospital_role: Option<String>,

    /// URL-encoded JSON data-access scope.
    #[serde(default)]
    pub data_access_scope: Option<String>,
}

/// Authorization response parameters.
///
/// Returned as query string parameters on the redirect URI after a
/// successful authorization.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    /// Single-use, expires after a short time (default 10 minutes).
    pub code: String,

    /// Echoed state parameter for CSRF validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error response.
///
/// Communicated via redirect to the client's redirect URI once that URI
/// has been validated, or as a direct JSON body before then.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter for CSRF validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationError {
    /// Creates a new authorization error.
    #[must_use]
    pub fn new(error: AuthorizationErrorCode, state: Option<String>) -> Self {
        Self {
            error,
            error_description: None,
            state,
        }
    }

    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 Section 4.1.2.1, plus
/// the registration-check code used before any redirect is trusted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed or the client is unknown.
    InvalidClient,

    /// The supplied redirect URI is not registered for the client.
    /// Always delivered as a direct response, never via redirect.
    InvalidRedirectUri,

    /// The client is not authorized to use this flow.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The requested response type is not supported.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or not allowed.
    InvalidScope,

    /// The authorization server encountered an unexpected condition.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
