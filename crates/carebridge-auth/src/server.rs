//! Authorization server façade.
//!
//! The [`AuthorizationServer`] implements the OAuth 2.0 `authorize` and
//! `token` operations and RFC 7662 introspection, orchestrating the
//! [`ClientManager`] and [`TokenService`] according to the grant-type
//! state machines. It also provides [`validate_token_for_api`], the
//! single chokepoint resource servers call before granting API access.
//!
//! # Error Delivery
//!
//! No internal error escapes this boundary. Failures discovered before
//! the redirect URI is validated return a structured JSON error (never a
//! redirect to an unverified URI); failures discovered after produce a
//! redirect carrying the OAuth error code with `state` preserved.
//! Unexpected faults are logged server-side and reported as
//! `server_error` with no detail.
//!
//! [`validate_token_for_api`]: AuthorizationServer::validate_token_for_api

use std::sync::Arc;

use crate::AuthResult;
use crate::clients::ClientManager;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::oauth::token::{TokenError, TokenRequest, TokenResponse};
use crate::token::introspection::IntrospectionResponse;
use crate::token::service::{IssueCodeRequest, IssueTokenRequest, IssuedTokens, TokenService};
use crate::types::{Client, ClientType, DataAccessScope, GrantType, HospitalRole};

// =============================================================================
// Results
// =============================================================================

/// Successful authorization: the URL to redirect the user agent to.
#[derive(Debug, Clone)]
pub struct AuthorizeRedirect {
    /// Redirect URI carrying `code` and (when supplied) `state`.
    pub redirect_uri: String,
}

/// Failed authorization.
#[derive(Debug, Clone)]
pub enum AuthorizeRejection {
    /// Structured error body; the redirect URI was not yet trusted.
    Response(AuthorizationError),
    /// Error encoded into the validated redirect URI.
    Redirect(String),
}

/// Result of the resource-server token chokepoint.
///
/// `valid == false` carries no claims: callers must not branch on why
/// access was denied.
#[derive(Debug, Clone, Default)]
pub struct ApiAccess {
    /// Whether the request may proceed.
    pub valid: bool,
    /// Client the token belongs to.
    pub client_id: Option<String>,
    /// User the token was issued for.
    pub user_id: Option<String>,
    /// Scopes granted to the token.
    pub scopes: Vec<String>,
    /// Hospital role carried by the authorization.
    pub hospital_role: Option<HospitalRole>,
    /// Department context carried by the authorization.
    pub department_id: Option<String>,
    /// Whether the token covers protected health information.
    pub phi_access: bool,
}

impl ApiAccess {
    /// An access denial with no claims.
    #[must_use]
    pub fn denied() -> Self {
        Self::default()
    }
}

// =============================================================================
// Authorization Server
// =============================================================================

/// Top-level OAuth 2.0 authorization server.
pub struct AuthorizationServer {
    clients: Arc<ClientManager>,
    tokens: Arc<TokenService>,
}

impl AuthorizationServer {
    /// Creates a new authorization server.
    #[must_use]
    pub fn new(clients: Arc<ClientManager>, tokens: Arc<TokenService>) -> Self {
        Self { clients, tokens }
    }

    /// Gets the client manager reference.
    #[must_use]
    pub fn clients(&self) -> &Arc<ClientManager> {
        &self.clients
    }

    /// Gets the token service reference.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    // -------------------------------------------------------------------------
    // Authorization endpoint
    // -------------------------------------------------------------------------

    /// Processes an authorization request for an authenticated user.
    ///
    /// The caller's identity (`user_id`, `organization_id`) comes from
    /// the host application's session layer; this server does not
    /// authenticate end users itself.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeRejection::Response`] for failures found before
    /// the redirect URI is trusted (missing parameters, unsupported
    /// response type, unknown client, unregistered redirect URI) and
    /// [`AuthorizeRejection::Redirect`] for failures found after (scope,
    /// hospital parameters, PKCE). Internal faults become a
    /// `server_error` response.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        user_id: &str,
        organization_id: &str,
    ) -> Result<AuthorizeRedirect, AuthorizeRejection> {
        match self.try_authorize(request, user_id, organization_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Authorization request failed internally");
                Err(AuthorizeRejection::Response(AuthorizationError::new(
                    AuthorizationErrorCode::ServerError,
                    request.state.clone(),
                )))
            }
        }
    }

    async fn try_authorize(
        &self,
        request: &AuthorizationRequest,
        user_id: &str,
        organization_id: &str,
    ) -> AuthResult<Result<AuthorizeRedirect, AuthorizeRejection>> {
        let state = request.state.clone();

        // 1. Required protocol parameters
        let (Some(response_type), Some(client_id), Some(redirect_uri)) = (
            request.response_type.as_deref(),
            request.client_id.as_deref(),
            request.redirect_uri.as_deref(),
        ) else {
            return Ok(Err(direct(
                AuthorizationErrorCode::InvalidRequest,
                "Missing required parameter: response_type, client_id, and redirect_uri are required",
                state,
            )));
        };

        // 2. Only the authorization code flow is supported
        if response_type != "code" {
            return Ok(Err(direct(
                AuthorizationErrorCode::UnsupportedResponseType,
                format!("Unsupported response_type: {response_type}"),
                state,
            )));
        }

        // 3. Client must resolve in the caller's organization
        let Some(client) = self.clients.get_client(client_id, organization_id).await? else {
            return Ok(Err(direct(
                AuthorizationErrorCode::InvalidClient,
                "Unknown client",
                state,
            )));
        };

        // 4. Redirect URI must be registered. A mismatch is answered
        //    directly: redirecting would hand the code to an unverified
        //    endpoint.
        if !client.is_redirect_uri_allowed(redirect_uri) {
            return Ok(Err(direct(
                AuthorizationErrorCode::InvalidRedirectUri,
                "redirect_uri is not registered for this client",
                state,
            )));
        }

        // The redirect URI is now trusted; remaining errors travel on it.

        // 5. Grant type must be allowed for this client
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Ok(Err(redirect_err(
                redirect_uri,
                AuthorizationErrorCode::UnauthorizedClient,
                "Client is not authorized for the authorization_code grant",
                state,
            )));
        }

        // 6. Requested scopes intersect with the registered scopes
        let resolved_scopes = client.resolve_scopes(request.scope.as_deref().unwrap_or(""));
        if resolved_scopes.is_empty() {
            return Ok(Err(redirect_err(
                redirect_uri,
                AuthorizationErrorCode::InvalidScope,
                "No requested scope is registered for this client",
                state,
            )));
        }

        // 7. Hospital role must be a known value when supplied
        let hospital_role = match request.hospital_role.as_deref() {
            None => None,
            Some(raw) => match HospitalRole::parse(raw) {
                Some(role) => Some(role),
                None => {
                    return Ok(Err(redirect_err(
                        redirect_uri,
                        AuthorizationErrorCode::InvalidRequest,
                        format!("Unknown hospital_role: {raw}"),
                        state,
                    )));
                }
            },
        };

        // 8. data_access_scope must be valid JSON when supplied
        let data_access_scope = match request.data_access_scope.as_deref() {
            None => None,
            Some(raw) => match DataAccessScope::parse_json(raw) {
                Ok(scope) => Some(scope),
                Err(e) => {
                    return Ok(Err(redirect_err(
                        redirect_uri,
                        AuthorizationErrorCode::InvalidRequest,
                        format!("Invalid data_access_scope: {e}"),
                        state,
                    )));
                }
            },
        };

        // 9. PKCE: public clients must present an S256 challenge;
        //    confidential clients may
        if let Err(description) = validate_pkce_params(&client, request) {
            return Ok(Err(redirect_err(
                redirect_uri,
                AuthorizationErrorCode::InvalidRequest,
                description,
                state,
            )));
        }

        // 10. Issue the code and build the redirect
        let code = self
            .tokens
            .issue_authorization_code(IssueCodeRequest {
                client_id: client.client_id.clone(),
                organization_id: organization_id.to_string(),
                user_id: user_id.to_string(),
                scope: resolved_scopes.join(" "),
                redirect_uri: redirect_uri.to_string(),
                code_challenge: request.code_challenge.clone(),
                code_challenge_method: request.code_challenge_method.clone(),
                department_id: request.department_id.clone(),
                hospital_role,
                data_access_scope,
                idempotency_key: None,
            })
            .await?;

        let location = AuthorizationResponse::new(code, state)
            .to_redirect_url(redirect_uri)
            .map_err(|e| {
                crate::error::AuthError::internal(format!("Redirect URL construction failed: {e}"))
            })?;

        Ok(Ok(AuthorizeRedirect {
            redirect_uri: location,
        }))
    }

    // -------------------------------------------------------------------------
    // Token endpoint
    // -------------------------------------------------------------------------

    /// Processes a token request, dispatching on `grant_type`.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] with a standard OAuth error code; internal
    /// faults become `server_error` with no detail.
    pub async fn token(
        &self,
        request: &TokenRequest,
        organization_id: &str,
    ) -> Result<TokenResponse, TokenError> {
        let result = match request.grant_type.as_str() {
            "authorization_code" => self.token_authorization_code(request, organization_id).await,
            "refresh_token" => self.token_refresh(request, organization_id).await,
            "client_credentials" => self.token_client_credentials(request, organization_id).await,
            other => Ok(Err(TokenError::unsupported_grant_type(format!(
                "Unsupported grant_type: {other}"
            )))),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, grant_type = %request.grant_type, "Token request failed internally");
                Err(TokenError::server_error())
            }
        }
    }

    /// Handles the `authorization_code` grant.
    async fn token_authorization_code(
        &self,
        request: &TokenRequest,
        organization_id: &str,
    ) -> AuthResult<Result<TokenResponse, TokenError>> {
        let Some(client_id) = request.client_id.as_deref() else {
            return Ok(Err(TokenError::invalid_request("Missing client_id")));
        };
        let (Some(code), Some(redirect_uri)) =
            (request.code.as_deref(), request.redirect_uri.as_deref())
        else {
            return Ok(Err(TokenError::invalid_request(
                "authorization_code grant requires code and redirect_uri",
            )));
        };

        // Client authentication: confidential clients present their
        // secret, public clients must be registered public and prove
        // possession via PKCE
        let client = match self
            .authenticate_for_grant(request, client_id, organization_id)
            .await?
        {
            Ok(client) => client,
            Err(error) => return Ok(Err(error)),
        };

        if client.client_type == ClientType::Public && request.code_verifier.is_none() {
            return Ok(Err(TokenError::invalid_request(
                "code_verifier is required for public clients",
            )));
        }

        // Redemption enforces single use, expiry, redirect binding, PKCE
        let Some(claims) = self
            .tokens
            .redeem_authorization_code(
                code,
                &client.client_id,
                redirect_uri,
                request.code_verifier.as_deref(),
            )
            .await?
        else {
            return Ok(Err(TokenError::invalid_grant(
                "Authorization code is invalid, expired, or already used",
            )));
        };

        let issued = self
            .tokens
            .issue_access_token(IssueTokenRequest {
                client_id: client.client_id.clone(),
                organization_id: claims.organization_id,
                user_id: Some(claims.user_id),
                scope: claims.scope,
                audience: None,
                expires_in: Some(client.token_lifetime_secs()),
                department_id: claims.department_id,
                hospital_role: claims.hospital_role,
                data_access_scope: claims.data_access_scope,
                idempotency_key: None,
            })
            .await?;

        Ok(Ok(token_response(issued)))
    }

    /// Handles the `refresh_token` grant.
    async fn token_refresh(
        &self,
        request: &TokenRequest,
        organization_id: &str,
    ) -> AuthResult<Result<TokenResponse, TokenError>> {
        let Some(client_id) = request.client_id.as_deref() else {
            return Ok(Err(TokenError::invalid_request("Missing client_id")));
        };
        let Some(refresh_token) = request.refresh_token.as_deref() else {
            return Ok(Err(TokenError::invalid_request(
                "refresh_token grant requires refresh_token",
            )));
        };

        let client = match self
            .authenticate_with_secret(request, client_id, organization_id)
            .await?
        {
            Ok(client) => client,
            Err(error) => return Ok(Err(error)),
        };

        if !client.is_grant_type_allowed(GrantType::RefreshToken) {
            return Ok(Err(TokenError::unauthorized_client(
                "Client is not authorized for the refresh_token grant",
            )));
        }

        let Some(issued) = self.tokens.refresh(refresh_token, &client.client_id).await? else {
            return Ok(Err(TokenError::invalid_grant(
                "Refresh token is invalid, expired, or revoked",
            )));
        };

        Ok(Ok(token_response(issued)))
    }

    /// Handles the `client_credentials` grant.
    async fn token_client_credentials(
        &self,
        request: &TokenRequest,
        organization_id: &str,
    ) -> AuthResult<Result<TokenResponse, TokenError>> {
        let Some(client_id) = request.client_id.as_deref() else {
            return Ok(Err(TokenError::invalid_request("Missing client_id")));
        };

        let client = match self
            .authenticate_with_secret(request, client_id, organization_id)
            .await?
        {
            Ok(client) => client,
            Err(error) => return Ok(Err(error)),
        };

        if !client.is_grant_type_allowed(GrantType::ClientCredentials) {
            return Ok(Err(TokenError::unauthorized_client(
                "Client is not authorized for the client_credentials grant",
            )));
        }

        let resolved_scopes = client.resolve_scopes(request.scope.as_deref().unwrap_or(""));
        if resolved_scopes.is_empty() {
            return Ok(Err(TokenError::invalid_scope(
                "No requested scope is registered for this client",
            )));
        }

        // Machine-to-machine: no end user, so no refresh token
        let issued = self
            .tokens
            .issue_access_token(IssueTokenRequest {
                client_id: client.client_id.clone(),
                organization_id: organization_id.to_string(),
                user_id: None,
                scope: resolved_scopes.join(" "),
                audience: None,
                expires_in: Some(client.token_lifetime_secs()),
                department_id: None,
                hospital_role: None,
                data_access_scope: None,
                idempotency_key: None,
            })
            .await?;

        Ok(Ok(token_response(issued)))
    }

    /// Authenticates a client for the authorization_code grant.
    ///
    /// Confidential clients must present a matching secret. Public
    /// clients authenticate via PKCE alone but must actually be
    /// registered as public.
    async fn authenticate_for_grant(
        &self,
        request: &TokenRequest,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Result<Client, TokenError>> {
        let Some(client) = self.clients.get_client(client_id, organization_id).await? else {
            return Ok(Err(TokenError::invalid_client(
                "Client authentication failed",
            )));
        };

        match client.client_type {
            ClientType::Confidential => {
                self.authenticate_with_secret(request, client_id, organization_id)
                    .await
            }
            ClientType::Public => {
                if request.client_secret.is_some() {
                    // A secret from a public client is a registration
                    // mismatch, not an authentication
                    return Ok(Err(TokenError::invalid_client(
                        "Public clients do not authenticate with a client secret",
                    )));
                }
                Ok(Ok(client))
            }
        }
    }

    /// Authenticates a client by its secret.
    async fn authenticate_with_secret(
        &self,
        request: &TokenRequest,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Result<Client, TokenError>> {
        let Some(client_secret) = request.client_secret.as_deref() else {
            return Ok(Err(TokenError::invalid_client(
                "Client authentication required",
            )));
        };

        let validated = self
            .clients
            .validate_credentials(client_id, client_secret, organization_id)
            .await?;

        Ok(validated.ok_or_else(|| TokenError::invalid_client("Client authentication failed")))
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Introspects a token for an authenticated client (RFC 7662).
    ///
    /// Client authentication is required before any token status is
    /// revealed.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when the caller's credentials are wrong,
    /// or `server_error` on internal faults.
    pub async fn introspect(
        &self,
        token: &str,
        client_id: &str,
        client_secret: &str,
        organization_id: &str,
    ) -> Result<IntrospectionResponse, TokenError> {
        let authenticated = match self
            .clients
            .validate_credentials(client_id, client_secret, organization_id)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Introspection failed internally");
                return Err(TokenError::server_error());
            }
        };

        if authenticated.is_none() {
            return Err(TokenError::invalid_client("Client authentication failed"));
        }

        self.tokens.introspect(token).await.map_err(|e| {
            tracing::error!(error = %e, "Introspection failed internally");
            TokenError::server_error()
        })
    }

    // -------------------------------------------------------------------------
    // Resource-server chokepoint
    // -------------------------------------------------------------------------

    /// Validates a bearer token for an API call.
    ///
    /// This is the single entry point resource servers use before
    /// granting access: it composes authentication (token validity) with
    /// authorization (scope, permission, department). Every failure —
    /// including internal faults — yields `valid: false` with no claims.
    pub async fn validate_token_for_api(
        &self,
        auth_header: &str,
        required_scope: &str,
        required_resource: &str,
        required_action: &str,
        organization_id: &str,
        department_id: Option<&str>,
    ) -> ApiAccess {
        match self
            .try_validate_token_for_api(
                auth_header,
                required_scope,
                required_resource,
                required_action,
                organization_id,
                department_id,
            )
            .await
        {
            Ok(access) => access,
            Err(e) => {
                // Fail closed on infrastructure trouble
                tracing::error!(error = %e, "API token validation failed internally");
                ApiAccess::denied()
            }
        }
    }

    async fn try_validate_token_for_api(
        &self,
        auth_header: &str,
        required_scope: &str,
        required_resource: &str,
        required_action: &str,
        organization_id: &str,
        department_id: Option<&str>,
    ) -> AuthResult<ApiAccess> {
        // Only the Bearer scheme is accepted
        let Some(token) = auth_header.strip_prefix("Bearer ") else {
            return Ok(ApiAccess::denied());
        };

        let Some(record) = self.tokens.validate_access_token(token).await? else {
            return Ok(ApiAccess::denied());
        };

        // A token from another tenant never grants access here
        if record.organization_id != organization_id {
            return Ok(ApiAccess::denied());
        }

        let permitted = self
            .clients
            .has_permission(
                &record.client_id,
                required_scope,
                required_resource,
                required_action,
                organization_id,
                department_id,
            )
            .await?;
        if !permitted {
            return Ok(ApiAccess::denied());
        }

        let phi_access = record.phi_access();
        Ok(ApiAccess {
            valid: true,
            client_id: Some(record.client_id),
            user_id: record.user_id,
            scopes: record.scope.split_whitespace().map(str::to_string).collect(),
            hospital_role: record.hospital_role,
            department_id: record.department_id,
            phi_access,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Builds a direct (non-redirect) rejection.
fn direct(
    code: AuthorizationErrorCode,
    description: impl Into<String>,
    state: Option<String>,
) -> AuthorizeRejection {
    AuthorizeRejection::Response(AuthorizationError::with_description(code, description, state))
}

/// Builds a redirect-carried rejection, falling back to a direct
/// response when the URI refuses to parse.
fn redirect_err(
    redirect_uri: &str,
    code: AuthorizationErrorCode,
    description: impl Into<String>,
    state: Option<String>,
) -> AuthorizeRejection {
    let error = AuthorizationError::with_description(code, description, state);
    match error.to_redirect_url(redirect_uri) {
        Ok(url) => AuthorizeRejection::Redirect(url),
        Err(_) => AuthorizeRejection::Response(error),
    }
}

/// Validates PKCE parameters at authorization time.
///
/// Returns a description of the violation, if any. The actual
/// verifier-against-challenge check happens at redemption.
fn validate_pkce_params(client: &Client, request: &AuthorizationRequest) -> Result<(), String> {
    match (
        request.code_challenge.as_deref(),
        request.code_challenge_method.as_deref(),
    ) {
        (None, None) => {
            if client.client_type == ClientType::Public {
                return Err(
                    "PKCE (code_challenge and code_challenge_method) is required for public clients"
                        .to_string(),
                );
            }
            Ok(())
        }
        (Some(challenge), Some(method)) => {
            PkceChallengeMethod::parse(method).map_err(|e| e.to_string())?;
            PkceChallenge::new(challenge.to_string()).map_err(|e| e.to_string())?;
            Ok(())
        }
        _ => Err("code_challenge and code_challenge_method must be provided together".to_string()),
    }
}

/// Maps issued tokens onto the wire response.
fn token_response(issued: IssuedTokens) -> TokenResponse {
    let mut response =
        TokenResponse::new(issued.access_token, issued.expires_in).with_scope(issued.scope);

    if let Some(refresh_token) = issued.refresh_token {
        response = response.with_refresh_token(refresh_token);
    }
    if let Some(role) = issued.hospital_role {
        response = response.with_hospital_role(role);
    }
    if let Some(department_id) = issued.department_id {
        response = response.with_department_id(department_id);
    }
    if let Some(phi_access) = issued.phi_access {
        response = response.with_phi_access(phi_access);
    }

    response
}

// =============================================================================
// Tests
// =============================================================================
