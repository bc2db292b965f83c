//! Permission storage trait.
//!
//! Permission rows refine a client's registered scopes down to concrete
//! (scope, resource, action) grants. Rows are append-only: revocation
//! sets `revoked_at`, nothing is ever deleted.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::ClientPermission;

/// Storage operations for fine-grained client permissions.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Appends a permission grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn add(&self, permission: &ClientPermission) -> AuthResult<()>;

    /// Lists all permission rows for a client, including revoked and
    /// expired ones. Callers filter with [`ClientPermission::is_active`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_client(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Vec<ClientPermission>>;

    /// Revokes the permission matching the composite key, setting
    /// `revoked_at`. Revoking an already-revoked row is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(
        &self,
        client_id: &str,
        organization_id: &str,
        scope: &str,
        resource: &str,
        action: &str,
        revoked_at: OffsetDateTime,
    ) -> AuthResult<()>;
}
