//! In-memory storage backend for the CareBridge authorization server.
//!
//! This crate implements the `carebridge-auth` storage ports with
//! RwLock-guarded maps. It backs the integration test suite and is
//! embeddable for development servers; production deployments provide
//! database-backed implementations instead.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use carebridge_auth::{ClientManager, TracingAuditSink};
//! use carebridge_auth_memory::{InMemoryClientStore, InMemoryPermissionStore};
//!
//! let manager = ClientManager::new(
//!     Arc::new(InMemoryClientStore::new()),
//!     Arc::new(InMemoryPermissionStore::new()),
//!     Arc::new(TracingAuditSink),
//! );
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use carebridge_auth::audit::{AuditEvent, AuditSink};
use carebridge_auth::error::AuthError;
use carebridge_auth::storage::{
    AccessTokenStore, AuthorizationCodeStore, ClientStore, PermissionStore, RefreshTokenStore,
};
use carebridge_auth::types::{AccessToken, AuthorizationCode, Client, ClientPermission, RefreshToken};
use carebridge_auth::AuthResult;

// =============================================================================
// Client Store
// =============================================================================

/// In-memory client store keyed by (client_id, organization_id).
#[derive(Default)]
pub struct InMemoryClientStore {
    clients: RwLock<HashMap<(String, String), Client>>,
}

impl InMemoryClientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn create(&self, client: &Client) -> AuthResult<Client> {
        let key = (client.client_id.clone(), client.organization_id.clone());
        let mut clients = self.clients.write().unwrap();
        if clients.contains_key(&key) {
            return Err(AuthError::storage(format!(
                "Client already exists: {}",
                client.client_id
            )));
        }
        clients.insert(key, client.clone());
        Ok(client.clone())
    }

    async fn find_by_client_id(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Option<Client>> {
        let key = (client_id.to_string(), organization_id.to_string());
        Ok(self.clients.read().unwrap().get(&key).cloned())
    }

    async fn update(&self, client: &Client) -> AuthResult<Client> {
        let key = (client.client_id.clone(), client.organization_id.clone());
        let mut clients = self.clients.write().unwrap();
        if !clients.contains_key(&key) {
            return Err(AuthError::not_found(format!(
                "Client not found: {}",
                client.client_id
            )));
        }
        clients.insert(key, client.clone());
        Ok(client.clone())
    }

    async fn list(
        &self,
        organization_id: &str,
        limit: i64,
        offset: i64,
    ) -> AuthResult<Vec<Client>> {
        let clients = self.clients.read().unwrap();
        let mut active: Vec<Client> = clients
            .values()
            .filter(|c| c.organization_id == organization_id && c.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn record_usage(
        &self,
        client_id: &str,
        organization_id: &str,
        used_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let key = (client_id.to_string(), organization_id.to_string());
        if let Some(client) = self.clients.write().unwrap().get_mut(&key) {
            client.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

// =============================================================================
// Permission Store
// =============================================================================

/// In-memory permission store (append-only rows).
#[derive(Default)]
pub struct InMemoryPermissionStore {
    rows: RwLock<Vec<ClientPermission>>,
}

impl InMemoryPermissionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn add(&self, permission: &ClientPermission) -> AuthResult<()> {
        self.rows.write().unwrap().push(permission.clone());
        Ok(())
    }

    async fn list_by_client(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Vec<ClientPermission>> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.client_id == client_id && p.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn revoke(
        &self,
        client_id: &str,
        organization_id: &str,
        scope: &str,
        resource: &str,
        action: &str,
        revoked_at: OffsetDateTime,
    ) -> AuthResult<()> {
        for p in self.rows.write().unwrap().iter_mut() {
            if p.client_id == client_id
                && p.organization_id == organization_id
                && p.matches(scope, resource, action)
                && p.revoked_at.is_none()
            {
                p.revoked_at = Some(revoked_at);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Authorization Code Store
// =============================================================================

/// In-memory authorization code store.
///
/// Consumption takes the write lock for the whole compare-and-set, so
/// concurrent redemption of one code has exactly one winner.
#[derive(Default)]
pub struct InMemoryCodeStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl InMemoryCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryCodeStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes
            .write()
            .unwrap()
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
        client_id: &str,
    ) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self
            .codes
            .read()
            .unwrap()
            .values()
            .find(|c| c.idempotency_key.as_deref() == Some(key) && c.client_id == client_id)
            .cloned())
    }

    async fn consume(
        &self,
        code: &str,
        client_id: &str,
    ) -> AuthResult<Option<AuthorizationCode>> {
        let mut codes = self.codes.write().unwrap();
        let Some(record) = codes.get_mut(code) else {
            return Ok(None);
        };
        if record.client_id != client_id || record.consumed_at.is_some() {
            return Ok(None);
        }
        record.consumed_at = Some(OffsetDateTime::now_utc());
        Ok(Some(record.clone()))
    }

    async fn delete(&self, code: &str) -> AuthResult<()> {
        self.codes.write().unwrap().remove(code);
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired());
        Ok((before - codes.len()) as u64)
    }
}

// =============================================================================
// Access Token Store
// =============================================================================

/// In-memory access token store keyed by token value.
#[derive(Default)]
pub struct InMemoryAccessTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl InMemoryAccessTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenStore for InMemoryAccessTokenStore {
    async fn create(&self, token: &AccessToken) -> AuthResult<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> AuthResult<Option<AccessToken>> {
        Ok(self.tokens.read().unwrap().get(token).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
        client_id: &str,
    ) -> AuthResult<Option<AccessToken>> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .values()
            .find(|t| t.idempotency_key.as_deref() == Some(key) && t.client_id == client_id)
            .cloned())
    }

    async fn revoke(&self, id: Uuid, revoked_at: OffsetDateTime) -> AuthResult<()> {
        for token in self.tokens.write().unwrap().values_mut() {
            if token.id == id && token.revoked_at.is_none() {
                token.revoked_at = Some(revoked_at);
            }
        }
        Ok(())
    }

    async fn touch(&self, token: &str, used_at: OffsetDateTime) -> AuthResult<()> {
        if let Some(record) = self.tokens.write().unwrap().get_mut(token) {
            record.last_used_at = Some(used_at);
        }
        Ok(())
    }

    async fn revoke_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut count = 0u64;
        for token in self.tokens.write().unwrap().values_mut() {
            if token.is_expired() && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }
}

// =============================================================================
// Refresh Token Store
// =============================================================================

/// In-memory refresh token store keyed by token value.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: &str,
        client_id: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .get(token)
            .filter(|t| t.client_id == client_id)
            .cloned())
    }

    async fn find_by_access_token(
        &self,
        access_token_id: Uuid,
    ) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .unwrap()
            .values()
            .find(|t| t.access_token_id == access_token_id)
            .cloned())
    }

    async fn revoke(&self, token: &str, revoked_at: OffsetDateTime) -> AuthResult<()> {
        if let Some(record) = self.tokens.write().unwrap().get_mut(token) {
            if record.revoked_at.is_none() {
                record.revoked_at = Some(revoked_at);
            }
        }
        Ok(())
    }

    async fn revoke_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut count = 0u64;
        for token in self.tokens.write().unwrap().values_mut() {
            if token.is_expired() && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }
}

// =============================================================================
// Recording Audit Sink
// =============================================================================

/// Audit sink that records events in memory for test assertions.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> AuthResult<()> {
        self.events.write().unwrap().push(event);
        Ok(())
    }
}
