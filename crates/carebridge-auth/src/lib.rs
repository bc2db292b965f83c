//! # carebridge-auth
//!
//! OAuth 2.0 authorization server core for the CareBridge hospital
//! platform.
//!
//! This crate provides:
//! - Client credential management with hospital policy (departments,
//!   data-access levels, PHI/audit invariants)
//! - Authorization-code issuance and single-use redemption with full
//!   PKCE (RFC 7636, S256)
//! - Opaque access/refresh token lifecycle with rotation-on-use
//! - RFC 7662 token introspection
//! - Audit logging for every security-relevant state change
//! - Axum HTTP handlers for the authorize/token/introspect endpoints
//!
//! ## Architecture
//!
//! Persistence is injected through the [`storage`] traits; this crate
//! never talks to a database directly. The [`clients::ClientManager`]
//! and [`token::TokenService`] own the domain rules, and the
//! [`server::AuthorizationServer`] façade composes them into the OAuth
//! grant-type state machines. Resource servers call
//! [`server::AuthorizationServer::validate_token_for_api`] before
//! granting API access.
//!
//! ## Modules
//!
//! - [`config`] - Authorization server configuration
//! - [`types`] - Domain entities and hospital-context value types
//! - [`oauth`] - Protocol request/response types and PKCE
//! - [`clients`] - Client registration, credentials, and permissions
//! - [`token`] - Token issuance, validation, rotation, introspection
//! - [`server`] - The OAuth endpoint façade
//! - [`storage`] - Persistence ports
//! - [`audit`] - Security event audit logging
//! - [`secret`] - Credential generation and hashing
//! - [`http`] - Axum HTTP handlers

pub mod audit;
pub mod clients;
pub mod config;
pub mod error;
pub mod http;
pub mod oauth;
pub mod secret;
pub mod server;
pub mod storage;
pub mod token;
pub mod types;

pub use audit::{AuditAction, AuditCrud, AuditEvent, AuditSink, TracingAuditSink};
pub use clients::{
    ActorContext, ClientManager, ClientUpdate, CreateClientRequest, PermissionGrant,
};
pub use config::{AuditConfig, AuthConfig, OAuthConfig};
pub use error::{AuthError, ErrorCategory};
pub use server::{ApiAccess, AuthorizationServer, AuthorizeRedirect, AuthorizeRejection};
pub use storage::{
    AccessTokenStore, AuthorizationCodeStore, ClientStore, PermissionStore, RefreshTokenStore,
};
pub use token::{
    CleanupStats, CodeClaims, IntrospectionResponse, IssueCodeRequest, IssueTokenRequest,
    IssuedTokens, TokenConfig, TokenService,
};
pub use types::{
    AccessToken, AuthorizationCode, Client, ClientPermission, ClientType, ClientValidationError,
    DataAccessLevel, DataAccessScope, GrantType, HospitalRole, RefreshToken,
};

/// Type alias for authorization server results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use carebridge_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
    pub use crate::clients::{
        ActorContext, ClientManager, ClientUpdate, CreateClientRequest, PermissionGrant,
    };
    pub use crate::config::AuthConfig;
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::server::{ApiAccess, AuthorizationServer, AuthorizeRejection};
    pub use crate::storage::{
        AccessTokenStore, AuthorizationCodeStore, ClientStore, PermissionStore, RefreshTokenStore,
    };
    pub use crate::token::{IssueCodeRequest, IssueTokenRequest, TokenConfig, TokenService};
    pub use crate::types::{
        Client, ClientPermission, ClientType, DataAccessScope, GrantType, HospitalRole,
    };
}
