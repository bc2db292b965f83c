//! Client storage trait.
//!
//! Defines the interface for OAuth client persistence operations.
//! All lookups are scoped by organization: a client registered in one
//! tenant is invisible to every other tenant.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 clients.
///
/// Rows are returned regardless of lifecycle state; callers decide
/// whether a retired client is acceptable for their operation. Clients
/// are never physically deleted.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Persists a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same `client_id` already
    /// exists in the organization or the storage operation fails.
    async fn create(&self, client: &Client) -> AuthResult<Client>;

    /// Finds a client by its OAuth `client_id` within an organization.
    ///
    /// Returns retired clients too; use [`Client::is_active`] to filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Option<Client>>;

    /// Replaces an existing client row.
    ///
    /// # Errors
    ///
    /// Returns an error if the client does not exist in the organization
    /// or the storage operation fails.
    async fn update(&self, client: &Client) -> AuthResult<Client>;

    /// Lists active clients in an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(
        &self,
        organization_id: &str,
        limit: i64,
        offset: i64,
    ) -> AuthResult<Vec<Client>>;

    /// Records a successful credential validation.
    ///
    /// Best-effort usage tracking; failures here do not affect the
    /// validation outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn record_usage(
        &self,
        client_id: &str,
        organization_id: &str,
        used_at: OffsetDateTime,
    ) -> AuthResult<()>;
}
