//! Axum HTTP handlers for the OAuth endpoints.
//!
//! The handlers expect the host application to attach request
//! extensions for caller identity:
//!
//! - [`CallerIdentity`] on the authorization endpoint (the signed-in
//!   user approving the request)
//! - [`TenantContext`] on the token and introspection endpoints (the
//!   organization the request is routed to)
//!
//! ```ignore
//! use axum::{Router, routing::{get, post}};
//! use carebridge_auth::http::{AuthState, authorize_handler, introspect_handler, token_handler};
//!
//! let app = Router::new()
//!     .route("/oauth/authorize", get(authorize_handler))
//!     .route("/oauth/token", post(token_handler))
//!     .route("/oauth/introspect", post(introspect_handler))
//!     .with_state(auth_state);
//! ```

mod authorize;
mod introspect;
mod token;

pub use authorize::authorize_handler;
pub use introspect::{IntrospectionForm, introspect_handler};
pub use token::token_handler;

use std::sync::Arc;

use crate::server::AuthorizationServer;

/// Shared state for the OAuth endpoint handlers.
#[derive(Clone)]
pub struct AuthState {
    /// The authorization server façade.
    pub server: Arc<AuthorizationServer>,
}

impl AuthState {
    /// Creates a new handler state.
    #[must_use]
    pub fn new(server: Arc<AuthorizationServer>) -> Self {
        Self { server }
    }
}

/// Identity of the signed-in user on the authorization endpoint.
///
/// Produced by the host application's session middleware; this crate
/// does not authenticate end users.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Authenticated user ID.
    pub user_id: String,
    /// Organization (tenant) of the session.
    pub organization_id: String,
}

/// Tenant routing context on the token and introspection endpoints.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Organization (tenant) the request is routed to.
    pub organization_id: String,
}
