//! OAuth 2.0 client domain types.
//!
//! This module defines the `Client` struct and related types for OAuth 2.0
//! client registrations, including the hospital policy fields (department
//! restrictions, data-access level, PHI/audit flags) that drive downstream
//! grant decisions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::context::DataAccessScope;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows a client is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (with PKCE for public clients).
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client Type
// =============================================================================

/// OAuth 2.0 client types per RFC 6749 Section 2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Client that can keep a secret secure (backend services).
    Confidential,
    /// Client that cannot keep a secret (browser apps, native apps).
    /// Authenticates via PKCE only.
    Public,
}

impl ClientType {
    /// Returns the string representation of the client type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confidential => "confidential",
            Self::Public => "public",
        }
    }
}

// =============================================================================
// Data Access Level
// =============================================================================

/// Breadth of hospital data a client may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAccessLevel {
    /// Non-clinical data only.
    Basic,
    /// Data within the client's allowed departments.
    Department,
    /// Patient-level clinical data.
    Patient,
}

impl Default for DataAccessLevel {
    fn default() -> Self {
        Self::Basic
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 client registration.
///
/// Represents a registered application with its credentials, protocol
/// configuration, and hospital policy. Clients are scoped to an
/// organization (tenant) and soft-deleted by setting `retired_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Internal row identifier.
    pub id: Uuid,

    /// Public client identifier used in OAuth flows ("hos_" prefix).
    pub client_id: String,

    /// Argon2id hash of the client secret (confidential clients only).
    /// Never serialized; the plaintext is returned once at registration.
    #[serde(skip_serializing, default)]
    pub secret_hash: Option<String>,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// Human-readable display name.
    pub name: String,

    /// Detailed description of the client application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Logo URL for consent/management screens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,

    /// Application homepage URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage_uri: Option<String>,

    /// Privacy policy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_uri: Option<String>,

    /// Whether this client can hold a secret.
    pub client_type: ClientType,

    /// Allowed redirect URIs (exact match) for authorization code flow.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Origins allowed for CORS requests from browser-based clients.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// OAuth scopes this client is allowed to request.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// OAuth 2.0 grant types this client is allowed to use.
    pub grant_types: Vec<GrantType>,

    /// Hospital departments this client may operate in.
    /// Empty means no department restriction at the client level.
    #[serde(default)]
    pub allowed_departments: Vec<String>,

    /// Breadth of hospital data this client may reach.
    #[serde(default)]
    pub data_access_level: DataAccessLevel,

    /// Whether this client may access protected health information.
    pub phi_access: bool,

    /// Whether accesses by this client must be audit-logged.
    /// Must be `true` whenever `phi_access` is `true`.
    pub audit_required: bool,

    /// Configured request rate limit (stored, not enforced here).
    pub rate_limit: u32,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,

    /// When this client was retired (soft delete). Active iff `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub retired_at: Option<OffsetDateTime>,

    /// Last successful credential validation.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_used_at: Option<OffsetDateTime>,

    /// User who registered this client.
    pub created_by: String,

    /// When this client was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this client was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Client {
    /// Validates the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration violates a registration rule
    /// or a hospital compliance invariant.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }

        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }

        if self.grant_types.is_empty() {
            return Err(ClientValidationError::NoGrantTypes);
        }

        // PHI access without audit logging is a compliance violation
        if self.phi_access && !self.audit_required {
            return Err(ClientValidationError::PhiWithoutAudit);
        }

        // Public clients cannot use client_credentials
        if self.client_type == ClientType::Public
            && self.grant_types.contains(&GrantType::ClientCredentials)
        {
            return Err(ClientValidationError::PublicClientCredentials);
        }

        // Confidential clients must have a hashed secret
        if self.client_type == ClientType::Confidential && self.secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        Ok(())
    }

    /// Returns `true` if this client is active (not retired).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }

    /// Checks if the given redirect URI is registered for this client.
    /// Comparison is exact; no wildcard or prefix matching.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given scope is registered for this client.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scopes.iter().any(|allowed| allowed == scope)
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Checks if the given origin is allowed for CORS.
    #[must_use]
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    /// Checks if the given department is within this client's restriction.
    /// An empty `allowed_departments` list means no restriction.
    #[must_use]
    pub fn is_department_allowed(&self, department_id: &str) -> bool {
        self.allowed_departments.is_empty()
            || self
                .allowed_departments
                .iter()
                .any(|allowed| allowed == department_id)
    }

    /// Intersects the requested scopes with the client's registered scopes.
    ///
    /// Order and duplicates follow the request; unknown scopes are dropped.
    #[must_use]
    pub fn resolve_scopes(&self, requested: &str) -> Vec<String> {
        requested
            .split_whitespace()
            .filter(|s| self.is_scope_allowed(s))
            .map(str::to_string)
            .collect()
    }

    /// Returns the access token lifetime in seconds.
    ///
    /// Defaults to 3600 (1 hour) if not specified.
    #[must_use]
    pub fn token_lifetime_secs(&self) -> i64 {
        self.token_lifetime.unwrap_or(3600)
    }

    /// Returns the refresh token lifetime in seconds.
    ///
    /// Defaults to 86400 (24 hours) if not specified.
    #[must_use]
    pub fn refresh_token_lifetime_secs(&self) -> i64 {
        self.refresh_token_lifetime.unwrap_or(86400)
    }

    /// Derives the PHI flag for an authorization under this client.
    ///
    /// The client's own `phi_access` flag must be set AND the requested
    /// data-access scope (if any) must ask for PHI.
    #[must_use]
    pub fn effective_phi_access(&self, data_access_scope: Option<&DataAccessScope>) -> bool {
        match data_access_scope {
            Some(scope) => self.phi_access && scope.phi_access,
            None => self.phi_access,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Client name cannot be empty.
    #[error("Client name cannot be empty")]
    EmptyName,

    /// At least one redirect URI is required.
    #[error("At least one redirect URI is required")]
    NoRedirectUris,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// PHI access requires audit logging.
    #[error("PHI access requires audit logging")]
    PhiWithoutAudit,

    /// Public clients cannot use client_credentials grant.
    #[error("Public clients cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,
}

// =============================================================================
// Tests
// =============================================================================
