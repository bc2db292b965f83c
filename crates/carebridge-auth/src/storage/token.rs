//! Access and refresh token storage traits.
//!
//! # Security Considerations
//!
//! - Token values are bearer secrets; backends must not write them to
//!   their own logs
//! - Revocation must be atomic and immediate
//! - Expired tokens are marked revoked (never deleted) so the audit
//!   trail survives

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{AccessToken, RefreshToken};

/// Storage operations for access tokens.
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    /// Persists a new access token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, token: &AccessToken) -> AuthResult<()>;

    /// Finds a token by its value.
    ///
    /// Returns the row regardless of expiry/revocation state; callers
    /// check `is_valid()` before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(&self, token: &str) -> AuthResult<Option<AccessToken>>;

    /// Finds a token by the idempotency key it was issued under.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_idempotency_key(
        &self,
        key: &str,
        client_id: &str,
    ) -> AuthResult<Option<AccessToken>>;

    /// Revokes a token by row ID, setting `revoked_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, id: Uuid, revoked_at: OffsetDateTime) -> AuthResult<()>;

    /// Updates `last_used_at` after a successful validation.
    ///
    /// Best-effort: callers log failures and continue.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn touch(&self, token: &str, used_at: OffsetDateTime) -> AuthResult<()>;

    /// Marks expired, not-yet-revoked tokens as revoked.
    ///
    /// Returns the number of tokens transitioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn revoke_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}

/// Storage operations for refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persists a new refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token issued to the given client by its value.
    ///
    /// Returns the row regardless of expiry/revocation state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(
        &self,
        token: &str,
        client_id: &str,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Finds the refresh token minted alongside a given access token.
    ///
    /// Used to replay an idempotent issuance with its original sibling.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_access_token(
        &self,
        access_token_id: Uuid,
    ) -> AuthResult<Option<RefreshToken>>;

    /// Revokes a refresh token, setting `revoked_at`.
    ///
    /// Must be atomic: once revoked, the token can never be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, token: &str, revoked_at: OffsetDateTime) -> AuthResult<()>;

    /// Marks expired, not-yet-revoked tokens as revoked.
    ///
    /// Returns the number of tokens transitioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn revoke_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
