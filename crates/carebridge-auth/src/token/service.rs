//! Token service for issuing and validating credentials.
//!
//! The [`TokenService`] owns the full lifecycle of authorization codes
//! and bearer tokens:
//!
//! - Authorization code issuance and single-use redemption
//! - Access/refresh token issuance (with hospital claims)
//! - Token validation and RFC 7662 introspection
//! - Refresh rotation (revoke-old, mint-new)
//! - Expiry cleanup
//!
//! # Security
//!
//! - Codes are consumed with an atomic compare-and-set: concurrent
//!   redemption of the same code yields exactly one winner
//! - PKCE verifiers are hashed and compared against the stored challenge
//! - Rotation is fail-closed: if minting fails after revocation, the
//!   client is left without valid credentials rather than with two
//! - Token values are never logged in full

use std::sync::Arc;

use serde_json::json;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::pkce::{PkceChallenge, PkceVerifier};
use crate::storage::{AccessTokenStore, AuthorizationCodeStore, RefreshTokenStore};
use crate::token::introspection::IntrospectionResponse;
use crate::types::{AccessToken, AuthorizationCode, DataAccessScope, HospitalRole, RefreshToken};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Server issuer URL (recorded on every access token).
    pub issuer: String,

    /// Default audience URL for issued tokens.
    pub audience: String,

    /// Authorization code lifetime.
    /// Default: 10 minutes, as recommended by the OAuth 2.0 spec.
    pub code_lifetime: Duration,

    /// Default access token lifetime. Can be overridden per request.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,
}

impl TokenConfig {
    /// Creates a new token configuration with defaults.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            code_lifetime: Duration::minutes(10),
            access_token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::hours(24),
        }
    }

    /// Builds a token configuration from the application config.
    #[must_use]
    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            code_lifetime: Duration::seconds(
                config.oauth.authorization_code_lifetime.as_secs() as i64
            ),
            access_token_lifetime: Duration::seconds(
                config.oauth.access_token_lifetime.as_secs() as i64
            ),
            refresh_token_lifetime: Duration::seconds(
                config.oauth.refresh_token_lifetime.as_secs() as i64,
            ),
        }
    }

    /// Sets the authorization code lifetime.
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.code_lifetime = lifetime;
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }
}

// =============================================================================
// Requests and Results
// =============================================================================

/// Request to issue an authorization code.
#[derive(Debug, Clone)]
pub struct IssueCodeRequest {
    /// Client the code is issued to.
    pub client_id: String,
    /// Owning organization (tenant).
    pub organization_id: String,
    /// User who approved the authorization.
    pub user_id: String,
    /// Granted scopes (space-separated).
    pub scope: String,
    /// Redirect URI the code is bound to.
    pub redirect_uri: String,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE challenge method ("S256").
    pub code_challenge_method: Option<String>,
    /// Department context.
    pub department_id: Option<String>,
    /// Hospital role of the authorizing user.
    pub hospital_role: Option<HospitalRole>,
    /// Structured data-access scope.
    pub data_access_scope: Option<DataAccessScope>,
    /// Optional idempotency key; a repeated key returns the original code.
    pub idempotency_key: Option<String>,
}

/// Claims embedded in a redeemed authorization code.
#[derive(Debug, Clone)]
pub struct CodeClaims {
    /// Owning organization (tenant).
    pub organization_id: String,
    /// User who approved the authorization.
    pub user_id: String,
    /// Granted scopes (space-separated).
    pub scope: String,
    /// Department context.
    pub department_id: Option<String>,
    /// Hospital role of the authorizing user.
    pub hospital_role: Option<HospitalRole>,
    /// Structured data-access scope.
    pub data_access_scope: Option<DataAccessScope>,
}

/// Request to issue an access token (and possibly a refresh token).
#[derive(Debug, Clone)]
pub struct IssueTokenRequest {
    /// Client the token is issued to.
    pub client_id: String,
    /// Owning organization (tenant).
    pub organization_id: String,
    /// User the token is issued for. `None` for client_credentials;
    /// a refresh token is only minted when a user is present.
    pub user_id: Option<String>,
    /// Granted scopes (space-separated).
    pub scope: String,
    /// Audience override; defaults to the configured audience.
    pub audience: Option<String>,
    /// Access token lifetime override in seconds.
    pub expires_in: Option<i64>,
    /// Department context.
    pub department_id: Option<String>,
    /// Hospital role of the authorizing user.
    pub hospital_role: Option<HospitalRole>,
    /// Structured data-access scope.
    pub data_access_scope: Option<DataAccessScope>,
    /// Optional idempotency key; a repeated key returns the original pair.
    pub idempotency_key: Option<String>,
}

/// Result of a token issuance.
///
/// Carries the granted claims alongside the credentials so callers can
/// echo them into the token response without a second lookup.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// The opaque bearer access token.
    pub access_token: String,
    /// Sibling refresh token (user-authorized grants only).
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Granted scopes (space-separated).
    pub scope: String,
    /// Hospital role carried by the authorization.
    pub hospital_role: Option<HospitalRole>,
    /// Department context carried by the authorization.
    pub department_id: Option<String>,
    /// PHI flag from the data-access scope; `None` when no scope was set.
    pub phi_access: Option<bool>,
}

impl IssuedTokens {
    /// Token type for the response body. Always "Bearer".
    #[must_use]
    pub fn token_type() -> &'static str {
        "Bearer"
    }
}

/// Counters from an expiry cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Expired authorization codes hard-deleted.
    pub codes_deleted: u64,
    /// Expired access tokens marked revoked.
    pub access_tokens_revoked: u64,
    /// Expired refresh tokens marked revoked.
    pub refresh_tokens_revoked: u64,
}

// =============================================================================
// Token Service
// =============================================================================

/// Service for issuing, validating, rotating, and introspecting
/// authorization codes and bearer tokens.
pub struct TokenService {
    codes: Arc<dyn AuthorizationCodeStore>,
    access_tokens: Arc<dyn AccessTokenStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    audit: Arc<dyn AuditSink>,
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        codes: Arc<dyn AuthorizationCodeStore>,
        access_tokens: Arc<dyn AccessTokenStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        audit: Arc<dyn AuditSink>,
        config: TokenConfig,
    ) -> Self {
        Self {
            codes,
            access_tokens,
            refresh_tokens,
            audit,
            config,
        }
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Authorization codes
    // -------------------------------------------------------------------------

    /// Issues an authorization code.
    ///
    /// The code expires after the configured lifetime (default 10
    /// minutes) and can be redeemed exactly once. When an idempotency
    /// key is supplied and a code was already issued under it, the
    /// original code is returned instead of minting a second one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage or audit operation fails.
    pub async fn issue_authorization_code(&self, request: IssueCodeRequest) -> AuthResult<String> {
        if let Some(ref key) = request.idempotency_key {
            if let Some(existing) = self
                .codes
                .find_by_idempotency_key(key, &request.client_id)
                .await?
            {
                tracing::debug!(client_id = %request.client_id, "Replaying code issuance for idempotency key");
                return Ok(existing.code);
            }
        }

        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: AuthorizationCode::generate_code(),
            client_id: request.client_id.clone(),
            organization_id: request.organization_id.clone(),
            user_id: request.user_id.clone(),
            scope: request.scope,
            redirect_uri: request.redirect_uri,
            code_challenge: request.code_challenge,
            code_challenge_method: request.code_challenge_method,
            department_id: request.department_id,
            hospital_role: request.hospital_role,
            data_access_scope: request.data_access_scope,
            idempotency_key: request.idempotency_key,
            created_at: now,
            expires_at: now + self.config.code_lifetime,
            consumed_at: None,
        };

        self.codes.create(&code).await?;

        self.audit
            .record(
                AuditEvent::new(
                    &code.organization_id,
                    &code.user_id,
                    AuditAction::CodeIssued,
                    "authorization_code",
                    code.id.to_string(),
                )
                .with_metadata(json!({
                    "clientId": code.client_id,
                    "scope": code.scope,
                    "departmentId": code.department_id,
                })),
            )
            .await?;

        Ok(code.code)
    }

    /// Redeems an authorization code.
    ///
    /// Returns `None` — never an error — for every expected failure:
    /// unknown code, code issued to another client, expired (the code is
    /// deleted as a side effect), already used, redirect URI mismatch,
    /// or PKCE verification failure. Consumption is atomic, so a
    /// concurrent redeemer observing `None` can never have leaked claims.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage or audit operation fails.
    pub async fn redeem_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> AuthResult<Option<CodeClaims>> {
        // Atomic single-use claim: exactly one concurrent caller gets the row
        let Some(record) = self.codes.consume(code, client_id).await? else {
            return Ok(None);
        };

        // Expired codes are not redeemable even by their first caller;
        // they carry no audit value once dead, so delete outright
        if record.is_expired() {
            self.codes.delete(code).await?;
            tracing::debug!(client_id, "Rejected expired authorization code");
            return Ok(None);
        }

        // The token request must present the identical redirect URI used
        // at issuance (prevents interception via a different endpoint)
        if record.redirect_uri != redirect_uri {
            tracing::debug!(client_id, "Authorization code redirect URI mismatch");
            return Ok(None);
        }

        // PKCE: a stored challenge must be answered with a matching verifier
        if let Some(ref challenge) = record.code_challenge {
            let Some(verifier) = code_verifier else {
                tracing::debug!(client_id, "Missing PKCE verifier for challenged code");
                return Ok(None);
            };
            if !verify_pkce(challenge, verifier) {
                tracing::debug!(client_id, "PKCE verification failed");
                return Ok(None);
            }
        }

        self.audit
            .record(
                AuditEvent::new(
                    &record.organization_id,
                    &record.user_id,
                    AuditAction::CodeRedeemed,
                    "authorization_code",
                    record.id.to_string(),
                )
                .with_metadata(json!({
                    "clientId": record.client_id,
                    "scope": record.scope,
                })),
            )
            .await?;

        Ok(Some(CodeClaims {
            organization_id: record.organization_id,
            user_id: record.user_id,
            scope: record.scope,
            department_id: record.department_id,
            hospital_role: record.hospital_role,
            data_access_scope: record.data_access_scope,
        }))
    }

    // -------------------------------------------------------------------------
    // Access and refresh tokens
    // -------------------------------------------------------------------------

    /// Issues an access token, and a sibling refresh token when a user
    /// is present.
    ///
    /// Client-credentials style calls (no `user_id`) never receive a
    /// refresh token: there is no end user whose session could be
    /// extended. When an idempotency key is supplied and tokens were
    /// already issued under it, the original pair is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage or audit operation fails.
    pub async fn issue_access_token(&self, request: IssueTokenRequest) -> AuthResult<IssuedTokens> {
        if let Some(ref key) = request.idempotency_key {
            if let Some(existing) = self
                .access_tokens
                .find_by_idempotency_key(key, &request.client_id)
                .await?
            {
                tracing::debug!(client_id = %request.client_id, "Replaying token issuance for idempotency key");
                let sibling = self
                    .refresh_tokens
                    .find_by_access_token(existing.id)
                    .await?;
                let expires_in =
                    (existing.expires_at - OffsetDateTime::now_utc()).whole_seconds().max(0);
                return Ok(IssuedTokens {
                    access_token: existing.token,
                    refresh_token: sibling.map(|t| t.token),
                    expires_in,
                    scope: existing.scope,
                    hospital_role: existing.hospital_role,
                    department_id: existing.department_id,
                    phi_access: existing.data_access_scope.map(|s| s.phi_access),
                });
            }
        }

        let now = OffsetDateTime::now_utc();
        let expires_in = request
            .expires_in
            .unwrap_or_else(|| self.config.access_token_lifetime.whole_seconds());

        let access_token = AccessToken {
            id: Uuid::new_v4(),
            token: AccessToken::generate_token(),
            client_id: request.client_id.clone(),
            organization_id: request.organization_id.clone(),
            user_id: request.user_id.clone(),
            scope: request.scope.clone(),
            audience: request
                .audience
                .unwrap_or_else(|| self.config.audience.clone()),
            issuer: self.config.issuer.clone(),
            department_id: request.department_id.clone(),
            hospital_role: request.hospital_role,
            data_access_scope: request.data_access_scope.clone(),
            idempotency_key: request.idempotency_key,
            created_at: now,
            expires_at: now + Duration::seconds(expires_in),
            revoked_at: None,
            last_used_at: None,
        };

        self.access_tokens.create(&access_token).await?;

        // Sibling refresh token only for user-authorized grants
        let refresh_token = if let Some(ref user_id) = request.user_id {
            let refresh = RefreshToken {
                id: Uuid::new_v4(),
                token: RefreshToken::generate_token(),
                access_token_id: access_token.id,
                client_id: request.client_id.clone(),
                organization_id: request.organization_id.clone(),
                user_id: user_id.clone(),
                scope: request.scope.clone(),
                department_id: request.department_id.clone(),
                hospital_role: request.hospital_role,
                data_access_scope: request.data_access_scope.clone(),
                created_at: now,
                expires_at: now + self.config.refresh_token_lifetime,
                revoked_at: None,
            };
            self.refresh_tokens.create(&refresh).await?;
            Some(refresh.token)
        } else {
            None
        };

        let phi_access = request
            .data_access_scope
            .as_ref()
            .map(|s| s.phi_access)
            .unwrap_or(false);

        self.audit
            .record(
                AuditEvent::new(
                    &access_token.organization_id,
                    access_token.user_id.as_deref().unwrap_or("system"),
                    AuditAction::TokenIssued,
                    "access_token",
                    access_token.id.to_string(),
                )
                .with_metadata(json!({
                    "clientId": access_token.client_id,
                    "scope": access_token.scope,
                    "expiresIn": expires_in,
                    "refreshTokenIssued": refresh_token.is_some(),
                    "phiAccess": phi_access,
                })),
            )
            .await?;

        tracing::debug!(
            client_id = %access_token.client_id,
            token_prefix = %access_token.log_prefix(),
            "Access token issued"
        );

        Ok(IssuedTokens {
            access_token: access_token.token,
            refresh_token,
            expires_in,
            scope: access_token.scope,
            hospital_role: access_token.hospital_role,
            department_id: access_token.department_id,
            phi_access: access_token.data_access_scope.map(|s| s.phi_access),
        })
    }

    /// Validates an access token.
    ///
    /// Returns `None` when the token is unknown, expired, or revoked.
    /// On success, `last_used_at` is updated best-effort: a failure to
    /// record usage never fails the validation.
    ///
    /// # Errors
    ///
    /// Returns an error only if the lookup itself fails.
    pub async fn validate_access_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        let Some(record) = self.access_tokens.find_by_token(token).await? else {
            return Ok(None);
        };

        if !record.is_valid() {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        if let Err(e) = self.access_tokens.touch(token, now).await {
            // Usage analytics only; not security-critical
            tracing::debug!(error = %e, "Failed to update token last_used_at");
        }

        Ok(Some(record))
    }

    /// Rotates a refresh token into a fresh token pair.
    ///
    /// Returns `None` for unknown-for-client, revoked, or expired tokens
    /// (an expired token is revoked as a side effect). On success the
    /// paired access token and the presented refresh token are revoked
    /// first, then a new pair is minted from the original claim set.
    ///
    /// Fail-closed: if minting fails after revocation, the old
    /// credentials stay revoked — a crash can never leave two valid
    /// pairs in circulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage or audit operation fails.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> AuthResult<Option<IssuedTokens>> {
        let Some(record) = self
            .refresh_tokens
            .find_by_token(refresh_token, client_id)
            .await?
        else {
            return Ok(None);
        };

        if record.is_revoked() {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        if record.is_expired() {
            // Dead tokens are revoked on sight so later lookups short-circuit
            self.refresh_tokens.revoke(refresh_token, now).await?;
            return Ok(None);
        }

        // Rotation: burn the old pair before minting the new one
        self.access_tokens.revoke(record.access_token_id, now).await?;
        self.refresh_tokens.revoke(refresh_token, now).await?;

        let issued = self
            .issue_access_token(IssueTokenRequest {
                client_id: record.client_id.clone(),
                organization_id: record.organization_id.clone(),
                user_id: Some(record.user_id.clone()),
                scope: record.scope.clone(),
                audience: None,
                expires_in: None,
                department_id: record.department_id.clone(),
                hospital_role: record.hospital_role,
                data_access_scope: record.data_access_scope.clone(),
                idempotency_key: None,
            })
            .await?;

        self.audit
            .record(
                AuditEvent::new(
                    &record.organization_id,
                    &record.user_id,
                    AuditAction::TokenRefreshed,
                    "refresh_token",
                    record.id.to_string(),
                )
                .with_metadata(json!({
                    "clientId": record.client_id,
                    "scope": record.scope,
                })),
            )
            .await?;

        Ok(Some(issued))
    }

    // -------------------------------------------------------------------------
    // Introspection and cleanup
    // -------------------------------------------------------------------------

    /// Introspects an access token per RFC 7662.
    ///
    /// Invalid tokens yield `{ "active": false }` with no other fields:
    /// callers must not learn whether the token is expired, revoked, or
    /// was never issued.
    ///
    /// # Errors
    ///
    /// Returns an error only if the lookup fails.
    pub async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        let Some(record) = self.validate_access_token(token).await? else {
            return Ok(IntrospectionResponse::inactive());
        };

        let mut response = IntrospectionResponse::active()
            .with_scope(&record.scope)
            .with_client_id(&record.client_id)
            .with_token_type("Bearer")
            .with_exp(record.expires_at.unix_timestamp())
            .with_iat(record.created_at.unix_timestamp())
            .with_sub(record.user_id.as_deref().unwrap_or(&record.client_id))
            .with_aud(&record.audience)
            .with_iss(&record.issuer)
            .with_phi_access(record.phi_access());

        if let Some(ref user_id) = record.user_id {
            response = response.with_username(user_id);
        }
        if let Some(role) = record.hospital_role {
            response = response.with_hospital_role(role.as_str());
        }
        if let Some(ref department_id) = record.department_id {
            response = response.with_department_id(department_id);
        }

        Ok(response)
    }

    /// Removes expired credentials.
    ///
    /// Expired authorization codes are hard-deleted (no audit value once
    /// dead and unused); expired tokens are marked revoked so the audit
    /// trail survives. Intended to run from an external scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if a cleanup operation fails.
    pub async fn cleanup_expired(&self) -> AuthResult<CleanupStats> {
        let now = OffsetDateTime::now_utc();

        let stats = CleanupStats {
            codes_deleted: self.codes.cleanup_expired().await?,
            access_tokens_revoked: self.access_tokens.revoke_expired(now).await?,
            refresh_tokens_revoked: self.refresh_tokens.revoke_expired(now).await?,
        };

        tracing::info!(
            codes_deleted = stats.codes_deleted,
            access_tokens_revoked = stats.access_tokens_revoked,
            refresh_tokens_revoked = stats.refresh_tokens_revoked,
            "Expired credential cleanup completed"
        );

        Ok(stats)
    }
}

/// Verifies a PKCE code verifier against a stored challenge.
///
/// Malformed challenges or verifiers fail verification rather than
/// erroring: at redemption time both were client-supplied.
fn verify_pkce(challenge: &str, verifier: &str) -> bool {
    let Ok(challenge) = PkceChallenge::new(challenge.to_string()) else {
        return false;
    };
    let Ok(verifier) = PkceVerifier::new(verifier.to_string()) else {
        return false;
    };
    challenge.verify(&verifier).is_ok()
}

// =============================================================================
// Tests
// =============================================================================
