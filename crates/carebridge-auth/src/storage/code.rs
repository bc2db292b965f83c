//! Authorization code storage trait.
//!
//! # Security Considerations
//!
//! Consumption must be an atomic compare-and-set on `consumed_at`:
//! when two token requests race on the same code, exactly one may win.
//! Backends that cannot express this as a conditional single-row update
//! must use a transactional read-modify-write with row-level locking.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::AuthorizationCode;

/// Storage operations for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Persists a new authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds a code by the idempotency key it was issued under.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_idempotency_key(
        &self,
        key: &str,
        client_id: &str,
    ) -> AuthResult<Option<AuthorizationCode>>;

    /// Atomically marks a code as consumed and returns it.
    ///
    /// Returns `None` when the code does not exist for the client or was
    /// already consumed — under concurrent redemption exactly one caller
    /// receives the code. Expiry is NOT checked here; the caller decides
    /// what to do with an expired-but-unconsumed code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(&self, code: &str, client_id: &str)
    -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes a code outright.
    ///
    /// Used when an expired code is presented (expired codes carry no
    /// audit value) and by the cleanup sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, code: &str) -> AuthResult<()>;

    /// Hard-deletes all expired codes.
    ///
    /// Returns the number of codes deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
