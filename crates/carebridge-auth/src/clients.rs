//! OAuth client management.
//!
//! The [`ClientManager`] handles registration, lookup, update, and
//! permissioning of OAuth clients. It is the trust anchor for every
//! downstream grant decision: the authorization server resolves and
//! authenticates clients exclusively through it.
//!
//! # Security
//!
//! - Client secrets are returned in plaintext exactly once at
//!   registration and stored only as Argon2id hashes
//! - Credential validation is indistinguishable between "unknown client"
//!   and "wrong secret": both paths run one hash verification and
//!   return `None`
//! - Clients are soft-deleted; history is never destroyed

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::error::AuthError;
use crate::secret;
use crate::storage::{ClientStore, PermissionStore};
use crate::types::client::ClientValidationError;
use crate::types::permission::DEFAULT_RISK_LEVEL;
use crate::types::{Client, ClientPermission, ClientType, DataAccessLevel, GrantType};

// =============================================================================
// Actor Context
// =============================================================================

/// Identity of the caller performing a management operation.
///
/// Provided by the host application's authentication layer. Management
/// operations are attributed to this identity in the audit log.
#[derive(Debug, Clone)]
pub struct ActorContext {
    /// Authenticated user performing the operation.
    pub user_id: String,

    /// Organization (tenant) the operation is scoped to.
    pub organization_id: String,
}

impl ActorContext {
    /// Creates an actor context.
    #[must_use]
    pub fn new(user_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            organization_id: organization_id.into(),
        }
    }

    /// Requires an actor identity to be present.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` when the host application could
    /// not establish a caller identity.
    pub fn require(actor: Option<Self>) -> AuthResult<Self> {
        actor.ok_or_else(|| AuthError::unauthorized("Actor identity required"))
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Client registration request.
///
/// Omitted policy fields fall back to the hospital defaults applied at
/// creation time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    /// Human-readable display name.
    pub name: String,

    /// Detailed description of the client application.
    #[serde(default)]
    pub description: Option<String>,

    /// Logo URL for consent/management screens.
    #[serde(default)]
    pub logo_uri: Option<String>,

    /// Application homepage URL.
    #[serde(default)]
    pub homepage_uri: Option<String>,

    /// Privacy policy URL.
    #[serde(default)]
    pub policy_uri: Option<String>,

    /// Whether this client can hold a secret.
    pub client_type: ClientType,

    /// Allowed redirect URIs. Must be non-empty.
    pub redirect_uris: Vec<String>,

    /// Origins allowed for CORS requests.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Scopes the client may request. Defaults to `["read", "write"]`.
    #[serde(default)]
    pub scopes: Option<Vec<String>>,

    /// Allowed grant types.
    /// Defaults to `[authorization_code, refresh_token]`.
    #[serde(default)]
    pub grant_types: Option<Vec<GrantType>>,

    /// Hospital departments the client may operate in.
    #[serde(default)]
    pub allowed_departments: Vec<String>,

    /// Breadth of hospital data access. Defaults to basic.
    #[serde(default)]
    pub data_access_level: Option<DataAccessLevel>,

    /// Whether this client may access PHI.
    #[serde(default)]
    pub phi_access: bool,

    /// Whether accesses must be audit-logged. Defaults to `true`;
    /// an explicit `false` combined with `phi_access` is rejected.
    #[serde(default)]
    pub audit_required: Option<bool>,

    /// Configured request rate limit. Defaults to 1000.
    #[serde(default)]
    pub rate_limit: Option<u32>,

    /// Access token lifetime in seconds. Defaults to 3600.
    #[serde(default)]
    pub token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds. Defaults to 86400.
    #[serde(default)]
    pub refresh_token_lifetime: Option<i64>,
}

/// Partial client update.
///
/// Every field is optional; present fields replace the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New logo URL.
    pub logo_uri: Option<String>,
    /// New homepage URL.
    pub homepage_uri: Option<String>,
    /// New policy URL.
    pub policy_uri: Option<String>,
    /// New redirect URI set.
    pub redirect_uris: Option<Vec<String>>,
    /// New allowed origin set.
    pub allowed_origins: Option<Vec<String>>,
    /// New scope set.
    pub scopes: Option<Vec<String>>,
    /// New grant type set.
    pub grant_types: Option<Vec<GrantType>>,
    /// New department set.
    pub allowed_departments: Option<Vec<String>>,
    /// New data access level.
    pub data_access_level: Option<DataAccessLevel>,
    /// New PHI access flag.
    pub phi_access: Option<bool>,
    /// New audit requirement flag.
    pub audit_required: Option<bool>,
    /// New rate limit.
    pub rate_limit: Option<u32>,
    /// New access token lifetime in seconds.
    pub token_lifetime: Option<i64>,
    /// New refresh token lifetime in seconds.
    pub refresh_token_lifetime: Option<i64>,
}

/// Fine-grained permission grant request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Scope string the permission refines.
    pub scope: String,
    /// Resource the permission applies to.
    pub resource: String,
    /// Action allowed on the resource.
    pub action: String,
    /// Departments this permission is limited to.
    #[serde(default)]
    pub department_restrictions: Vec<String>,
    /// Data classification label.
    #[serde(default)]
    pub data_classification: Option<String>,
    /// PHI access level label.
    #[serde(default)]
    pub phi_access_level: Option<String>,
    /// Risk classification. Defaults to "medium".
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Whether compliance review is required. Defaults to `true`.
    #[serde(default)]
    pub compliance_required: Option<bool>,
    /// Expiry of this grant.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

// =============================================================================
// Client Manager
// =============================================================================

/// Manager for OAuth client registrations and permissions.
pub struct ClientManager {
    clients: Arc<dyn ClientStore>,
    permissions: Arc<dyn PermissionStore>,
    audit: Arc<dyn AuditSink>,
}

impl ClientManager {
    /// Creates a new client manager.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientStore>,
        permissions: Arc<dyn PermissionStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            clients,
            permissions,
            audit,
        }
    }

    /// Registers a new OAuth client.
    ///
    /// Returns the created client together with the plaintext secret.
    /// The secret is never retrievable again: only its Argon2id hash is
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No redirect URI is supplied (`Validation`)
    /// - `phi_access` is requested with `audit_required` explicitly
    ///   disabled (`PolicyViolation`)
    /// - The storage or audit operation fails
    pub async fn create_client(
        &self,
        request: CreateClientRequest,
        actor: &ActorContext,
    ) -> AuthResult<(Client, String)> {
        // PHI without audit logging is rejected before any defaulting
        if request.phi_access && request.audit_required == Some(false) {
            return Err(AuthError::policy_violation(
                "PHI access requires audit logging",
            ));
        }

        let now = OffsetDateTime::now_utc();
        let client_id = secret::generate_client_id();
        let plaintext_secret = secret::generate_client_secret();
        let secret_hash = match request.client_type {
            ClientType::Confidential => Some(
                secret::hash_secret(&plaintext_secret)
                    .map_err(|e| AuthError::internal(format!("Secret hashing failed: {e}")))?,
            ),
            ClientType::Public => None,
        };

        let client = Client {
            id: Uuid::new_v4(),
            client_id,
            secret_hash,
            organization_id: actor.organization_id.clone(),
            name: request.name,
            description: request.description,
            logo_uri: request.logo_uri,
            homepage_uri: request.homepage_uri,
            policy_uri: request.policy_uri,
            client_type: request.client_type,
            redirect_uris: request.redirect_uris,
            allowed_origins: request.allowed_origins,
            scopes: request
                .scopes
                .unwrap_or_else(|| vec!["read".to_string(), "write".to_string()]),
            grant_types: request
                .grant_types
                .unwrap_or_else(|| vec![GrantType::AuthorizationCode, GrantType::RefreshToken]),
            allowed_departments: request.allowed_departments,
            data_access_level: request.data_access_level.unwrap_or_default(),
            phi_access: request.phi_access,
            audit_required: request.audit_required.unwrap_or(true),
            rate_limit: request.rate_limit.unwrap_or(1000),
            token_lifetime: request.token_lifetime,
            refresh_token_lifetime: request.refresh_token_lifetime,
            retired_at: None,
            last_used_at: None,
            created_by: actor.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        client.validate().map_err(map_validation_error)?;

        let created = self.clients.create(&client).await?;

        self.audit
            .record(
                AuditEvent::new(
                    &actor.organization_id,
                    &actor.user_id,
                    AuditAction::ClientCreated,
                    "oauth_client",
                    &created.client_id,
                )
                .with_resource_name(&created.name)
                .with_metadata(json!({
                    "clientType": created.client_type.as_str(),
                    "scopes": created.scopes,
                    "phiAccess": created.phi_access,
                    "redirectUris": created.redirect_uris,
                })),
            )
            .await?;

        tracing::info!(client_id = %created.client_id, "OAuth client registered");

        Ok((created, plaintext_secret))
    }

    /// Looks up an active client in an organization.
    ///
    /// Returns `None` when the client does not exist or has been retired;
    /// absence is the caller's data, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_client(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Option<Client>> {
        let client = self
            .clients
            .find_by_client_id(client_id, organization_id)
            .await?;
        Ok(client.filter(Client::is_active))
    }

    /// Lists active clients in an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn list_clients(
        &self,
        organization_id: &str,
        limit: i64,
        offset: i64,
    ) -> AuthResult<Vec<Client>> {
        self.clients.list(organization_id, limit, offset).await
    }

    /// Validates client credentials.
    ///
    /// Returns the client on success, `None` on any mismatch. "No such
    /// client", "retired client", "public client", and "wrong secret"
    /// are indistinguishable to the caller: each path runs exactly one
    /// Argon2 verification and yields the same `None`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage operation fails.
    pub async fn validate_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        organization_id: &str,
    ) -> AuthResult<Option<Client>> {
        let client = self
            .clients
            .find_by_client_id(client_id, organization_id)
            .await?
            .filter(Client::is_active);

        let Some(client) = client else {
            secret::verify_against_dummy(client_secret);
            return Ok(None);
        };

        let Some(ref hash) = client.secret_hash else {
            secret::verify_against_dummy(client_secret);
            return Ok(None);
        };

        let matches = secret::verify_secret(client_secret, hash)
            .map_err(|e| AuthError::internal(format!("Secret verification failed: {e}")))?;
        if !matches {
            return Ok(None);
        }

        let now = OffsetDateTime::now_utc();
        if let Err(e) = self
            .clients
            .record_usage(client_id, organization_id, now)
            .await
        {
            // Usage tracking is best-effort
            tracing::warn!(client_id, error = %e, "Failed to record client usage");
        }

        Ok(Some(client))
    }

    /// Applies a partial update to a client.
    ///
    /// The PHI/audit invariant is re-validated on the merged field set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no active client matches, a validation or
    /// policy error when the merged state is invalid, or a storage/audit
    /// error.
    pub async fn update_client(
        &self,
        client_id: &str,
        update: ClientUpdate,
        actor: &ActorContext,
    ) -> AuthResult<Client> {
        let mut client = self
            .get_client(client_id, &actor.organization_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Client not found: {client_id}")))?;

        let mut changed: Vec<&'static str> = Vec::new();
        macro_rules! apply {
            ($field:ident) => {
                if let Some(value) = update.$field {
                    client.$field = value;
                    changed.push(stringify!($field));
                }
            };
            (opt $field:ident) => {
                if let Some(value) = update.$field {
                    client.$field = Some(value);
                    changed.push(stringify!($field));
                }
            };
        }

        apply!(name);
        apply!(opt description);
        apply!(opt logo_uri);
        apply!(opt homepage_uri);
        apply!(opt policy_uri);
        apply!(redirect_uris);
        apply!(allowed_origins);
        apply!(scopes);
        apply!(grant_types);
        apply!(allowed_departments);
        apply!(data_access_level);
        apply!(phi_access);
        apply!(audit_required);
        apply!(rate_limit);
        apply!(opt token_lifetime);
        apply!(opt refresh_token_lifetime);

        client.updated_at = OffsetDateTime::now_utc();
        client.validate().map_err(map_validation_error)?;

        let updated = self.clients.update(&client).await?;

        self.audit
            .record(
                AuditEvent::new(
                    &actor.organization_id,
                    &actor.user_id,
                    AuditAction::ClientUpdated,
                    "oauth_client",
                    &updated.client_id,
                )
                .with_resource_name(&updated.name)
                .with_metadata(json!({ "changedFields": changed })),
            )
            .await?;

        Ok(updated)
    }

    /// Retires a client (soft delete).
    ///
    /// The row is never physically deleted: audit history must survive.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no active client matches, or a
    /// storage/audit error.
    pub async fn revoke_client(&self, client_id: &str, actor: &ActorContext) -> AuthResult<()> {
        let mut client = self
            .get_client(client_id, &actor.organization_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Client not found: {client_id}")))?;

        let now = OffsetDateTime::now_utc();
        client.retired_at = Some(now);
        client.updated_at = now;
        self.clients.update(&client).await?;

        self.audit
            .record(
                AuditEvent::new(
                    &actor.organization_id,
                    &actor.user_id,
                    AuditAction::ClientRevoked,
                    "oauth_client",
                    &client.client_id,
                )
                .with_resource_name(&client.name),
            )
            .await?;

        tracing::info!(client_id, "OAuth client retired");
        Ok(())
    }

    /// Grants a fine-grained permission to a client.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no active client matches, or a
    /// storage/audit error.
    pub async fn add_permission(
        &self,
        client_id: &str,
        grant: PermissionGrant,
        actor: &ActorContext,
    ) -> AuthResult<()> {
        let client = self
            .get_client(client_id, &actor.organization_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Client not found: {client_id}")))?;

        let permission = ClientPermission {
            client_id: client.client_id.clone(),
            organization_id: actor.organization_id.clone(),
            scope: grant.scope,
            resource: grant.resource,
            action: grant.action,
            department_restrictions: grant.department_restrictions,
            data_classification: grant.data_classification,
            phi_access_level: grant.phi_access_level,
            risk_level: grant
                .risk_level
                .unwrap_or_else(|| DEFAULT_RISK_LEVEL.to_string()),
            compliance_required: grant.compliance_required.unwrap_or(true),
            granted_by: actor.user_id.clone(),
            granted_at: OffsetDateTime::now_utc(),
            expires_at: grant.expires_at,
            revoked_at: None,
        };

        self.permissions.add(&permission).await?;

        self.audit
            .record(
                AuditEvent::new(
                    &actor.organization_id,
                    &actor.user_id,
                    AuditAction::PermissionGranted,
                    "oauth_client_permission",
                    &client.client_id,
                )
                .with_metadata(json!({
                    "scope": permission.scope,
                    "resource": permission.resource,
                    "action": permission.action,
                    "riskLevel": permission.risk_level,
                    "phiAccessLevel": permission.phi_access_level,
                    "departmentRestrictions": permission.department_restrictions,
                })),
            )
            .await?;

        Ok(())
    }

    /// Revokes a fine-grained permission.
    ///
    /// The row is kept with `revoked_at` set; permission history is
    /// never destroyed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no active client matches, or a
    /// storage/audit error.
    pub async fn revoke_permission(
        &self,
        client_id: &str,
        scope: &str,
        resource: &str,
        action: &str,
        actor: &ActorContext,
    ) -> AuthResult<()> {
        let client = self
            .get_client(client_id, &actor.organization_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Client not found: {client_id}")))?;

        self.permissions
            .revoke(
                &client.client_id,
                &actor.organization_id,
                scope,
                resource,
                action,
                OffsetDateTime::now_utc(),
            )
            .await?;

        self.audit
            .record(
                AuditEvent::new(
                    &actor.organization_id,
                    &actor.user_id,
                    AuditAction::PermissionRevoked,
                    "oauth_client_permission",
                    &client.client_id,
                )
                .with_metadata(json!({
                    "scope": scope,
                    "resource": resource,
                    "action": action,
                })),
            )
            .await?;

        Ok(())
    }

    /// Lists all permission rows for a client, including revoked ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn get_permissions(
        &self,
        client_id: &str,
        organization_id: &str,
    ) -> AuthResult<Vec<ClientPermission>> {
        self.permissions
            .list_by_client(client_id, organization_id)
            .await
    }

    /// Checks whether a client may perform (scope, resource, action),
    /// optionally within a department.
    ///
    /// The check short-circuits on the first failing condition:
    ///
    /// 1. the client exists and is active
    /// 2. the scope is registered on the client
    /// 3. an active, unexpired permission row matches the triple exactly
    /// 4. the department (when supplied) satisfies the row's restriction
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn has_permission(
        &self,
        client_id: &str,
        scope: &str,
        resource: &str,
        action: &str,
        organization_id: &str,
        department_id: Option<&str>,
    ) -> AuthResult<bool> {
        let Some(client) = self.get_client(client_id, organization_id).await? else {
            return Ok(false);
        };

        if !client.is_scope_allowed(scope) {
            return Ok(false);
        }

        let permissions = self
            .permissions
            .list_by_client(client_id, organization_id)
            .await?;

        let matched = permissions
            .iter()
            .filter(|p| p.is_active() && p.matches(scope, resource, action))
            .find(|p| match department_id {
                Some(dept) => p.allows_department(dept),
                None => true,
            });

        Ok(matched.is_some())
    }
}

/// Maps domain validation failures onto the error taxonomy.
fn map_validation_error(err: ClientValidationError) -> AuthError {
    match err {
        ClientValidationError::PhiWithoutAudit => AuthError::policy_violation(err.to_string()),
        _ => AuthError::validation(err.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Mock client store for testing.
    #[derive(Default)]
    struct MockClientStore {
        clients: RwLock<HashMap<(String, String), Client>>,
    }

    #[async_trait::async_trait]
    impl ClientStore for MockClientStore {
        async fn create(&self, client: &Client) -> AuthResult<Client> {
            let key = (client.client_id.clone(), client.organization_id.clone());
            self.clients.write().unwrap().insert(key, client.clone());
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
                return Err(AuthError::not_found("no such client"));
            }
            clients.insert(key, client.clone());
            Ok(client.clone())
        }

        async fn list(
            &self,
            organization_id: &str,
            _limit: i64,
            _offset: i64,
        ) -> AuthResult<Vec<Client>> {
            Ok(self
                .clients
                .read()
                .unwrap()
                .values()
                .filter(|c| c.organization_id == organization_id && c.is_active())
                .cloned()
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

    /// Mock permission store for testing.
    #[derive(Default)]
    struct MockPermissionStore {
        rows: RwLock<Vec<ClientPermission>>,
    }

    #[async_trait::async_trait]
    impl PermissionStore for MockPermissionStore {
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

    /// Audit sink that captures events for assertions.
    #[derive(Default)]
    struct CapturingSink {
        events: RwLock<Vec<AuditEvent>>,
    }

    #[async_trait::async_trait]
    impl AuditSink for CapturingSink {
        async fn record(&self, event: AuditEvent) -> AuthResult<()> {
            self.events.write().unwrap().push(event);
            Ok(())
        }
    }

    fn make_manager() -> (ClientManager, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink::default());
        let manager = ClientManager::new(
            Arc::new(MockClientStore::default()),
            Arc::new(MockPermissionStore::default()),
            sink.clone(),
        );
        (manager, sink)
    }

    fn actor() -> ActorContext {
        ActorContext::new("u1", "org-1")
    }

    fn make_request() -> CreateClientRequest {
        CreateClientRequest {
            name: "EMR Integration".to_string(),
            description: None,
            logo_uri: None,
            homepage_uri: None,
            policy_uri: None,
            client_type: ClientType::Confidential,
            redirect_uris: vec!["https://emr.test/cb".to_string()],
            allowed_origins: vec![],
            scopes: Some(vec!["read".to_string(), "patient:read".to_string()]),
            grant_types: None,
            allowed_departments: vec![],
            data_access_level: None,
            phi_access: true,
            audit_required: Some(true),
            rate_limit: None,
            token_lifetime: None,
            refresh_token_lifetime: None,
        }
    }

    #[tokio::test]
    async fn test_create_client_defaults_and_secret() {
        let (manager, sink) = make_manager();

        let (client, plaintext) = manager.create_client(make_request(), &actor()).await.unwrap();

        assert!(client.client_id.starts_with("hos_"));
        assert_eq!(plaintext.len(), 43);
        // Stored hash must differ from the plaintext
        assert_ne!(client.secret_hash.as_deref(), Some(plaintext.as_str()));
        assert!(client.secret_hash.as_deref().unwrap().starts_with("$argon2id$"));
        // Defaults
        assert_eq!(
            client.grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert_eq!(client.rate_limit, 1000);
        assert!(client.audit_required);
        assert!(client.is_active());

        // One audit event, without the secret anywhere in it
        let events = sink.events.read().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ClientCreated);
        let metadata = events[0].metadata.to_string();
        assert!(!metadata.contains(&plaintext));
    }

    #[tokio::test]
    async fn test_create_client_requires_redirect_uris() {
        let (manager, _) = make_manager();
        let mut request = make_request();
        request.redirect_uris = vec![];

        let result = manager.create_client(request, &actor()).await;
        assert!(matches!(result, Err(AuthError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_client_phi_without_audit_rejected() {
        let (manager, _) = make_manager();
        let mut request = make_request();
        request.phi_access = true;
        request.audit_required = Some(false);

        let result = manager.create_client(request, &actor()).await;
        assert!(matches!(result, Err(AuthError::PolicyViolation { .. })));
    }

    #[tokio::test]
    async fn test_actor_required() {
        assert!(matches!(
            ActorContext::require(None),
            Err(AuthError::Unauthorized { .. })
        ));
        assert!(ActorContext::require(Some(actor())).is_ok());
    }

    #[tokio::test]
    async fn test_get_client_scoping() {
        let (manager, _) = make_manager();
        let (client, _) = manager.create_client(make_request(), &actor()).await.unwrap();

        assert!(manager
            .get_client(&client.client_id, "org-1")
            .await
            .unwrap()
            .is_some());
        // Different organization sees nothing
        assert!(manager
            .get_client(&client.client_id, "org-2")
            .await
            .unwrap()
            .is_none());
        // Unknown client is None, not an error
        assert!(manager.get_client("hos_missing", "org-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate_credentials() {
        let (manager, _) = make_manager();
        let (client, plaintext) = manager.create_client(make_request(), &actor()).await.unwrap();

        let validated = manager
            .validate_credentials(&client.client_id, &plaintext, "org-1")
            .await
            .unwrap();
        assert!(validated.is_some());
        assert!(validated.unwrap().last_used_at.is_some());

        // Wrong secret and unknown client are the same None
        assert!(manager
            .validate_credentials(&client.client_id, "wrong", "org-1")
            .await
            .unwrap()
            .is_none());
        assert!(manager
            .validate_credentials("hos_missing", &plaintext, "org-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_client_merged_invariant() {
        let (manager, _) = make_manager();
        let (client, _) = manager.create_client(make_request(), &actor()).await.unwrap();

        // Turning audit off while PHI stays on violates the invariant
        let update = ClientUpdate {
            audit_required: Some(false),
            ..ClientUpdate::default()
        };
        let result = manager.update_client(&client.client_id, update, &actor()).await;
        assert!(matches!(result, Err(AuthError::PolicyViolation { .. })));

        // Turning both off together is fine
        let update = ClientUpdate {
            phi_access: Some(false),
            audit_required: Some(false),
            ..ClientUpdate::default()
        };
        let updated = manager
            .update_client(&client.client_id, update, &actor())
            .await
            .unwrap();
        assert!(!updated.phi_access);
        assert!(!updated.audit_required);
    }

    #[tokio::test]
    async fn test_update_unknown_client() {
        let (manager, _) = make_manager();
        let result = manager
            .update_client("hos_missing", ClientUpdate::default(), &actor())
            .await;
        assert!(matches!(result, Err(AuthError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_revoke_client_soft_delete() {
        let (manager, sink) = make_manager();
        let (client, plaintext) = manager.create_client(make_request(), &actor()).await.unwrap();

        manager.revoke_client(&client.client_id, &actor()).await.unwrap();

        // Gone from active lookup and credential validation
        assert!(manager
            .get_client(&client.client_id, "org-1")
            .await
            .unwrap()
            .is_none());
        assert!(manager
            .validate_credentials(&client.client_id, &plaintext, "org-1")
            .await
            .unwrap()
            .is_none());

        let events = sink.events.read().unwrap();
        assert_eq!(events.last().unwrap().action, AuditAction::ClientRevoked);
    }

    fn make_grant() -> PermissionGrant {
        PermissionGrant {
            scope: "patient:read".to_string(),
            resource: "patient_data".to_string(),
            action: "read".to_string(),
            department_restrictions: vec!["cardiology".to_string()],
            data_classification: Some("phi".to_string()),
            phi_access_level: Some("full".to_string()),
            risk_level: None,
            compliance_required: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_permission_defaults() {
        let (manager, _) = make_manager();
        let (client, _) = manager.create_client(make_request(), &actor()).await.unwrap();

        manager
            .add_permission(&client.client_id, make_grant(), &actor())
            .await
            .unwrap();

        let permissions = manager.get_permissions(&client.client_id, "org-1").await.unwrap();
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0].risk_level, "medium");
        assert!(permissions[0].compliance_required);
        assert_eq!(permissions[0].granted_by, "u1");
    }

    #[tokio::test]
    async fn test_has_permission_short_circuit() {
        let (manager, _) = make_manager();
        let (client, _) = manager.create_client(make_request(), &actor()).await.unwrap();
        manager
            .add_permission(&client.client_id, make_grant(), &actor())
            .await
            .unwrap();

        // Full match
        assert!(manager
            .has_permission(
                &client.client_id,
                "patient:read",
                "patient_data",
                "read",
                "org-1",
                Some("cardiology"),
            )
            .await
            .unwrap());

        // No department supplied: restriction not evaluated
        assert!(manager
            .has_permission(
                &client.client_id,
                "patient:read",
                "patient_data",
                "read",
                "org-1",
                None,
            )
            .await
            .unwrap());

        // Department outside the restriction
        assert!(!manager
            .has_permission(
                &client.client_id,
                "patient:read",
                "patient_data",
                "read",
                "org-1",
                Some("oncology"),
            )
            .await
            .unwrap());

        // Scope not registered on the client
        assert!(!manager
            .has_permission(&client.client_id, "admin", "patient_data", "read", "org-1", None)
            .await
            .unwrap());

        // No permission row for the triple
        assert!(!manager
            .has_permission(
                &client.client_id,
                "patient:read",
                "patient_data",
                "write",
                "org-1",
                None,
            )
            .await
            .unwrap());

        // Unknown client
        assert!(!manager
            .has_permission("hos_missing", "patient:read", "patient_data", "read", "org-1", None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_revoke_permission_keeps_history() {
        let (manager, sink) = make_manager();
        let (client, _) = manager.create_client(make_request(), &actor()).await.unwrap();
        manager
            .add_permission(&client.client_id, make_grant(), &actor())
            .await
            .unwrap();

        manager
            .revoke_permission(&client.client_id, "patient:read", "patient_data", "read", &actor())
            .await
            .unwrap();

        // Effective access is gone
        assert!(!manager
            .has_permission(
                &client.client_id,
                "patient:read",
                "patient_data",
                "read",
                "org-1",
                None,
            )
            .await
            .unwrap());

        // The row itself survives with revoked_at set
        let rows = manager.get_permissions(&client.client_id, "org-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_revoked());

        let events = sink.events.read().unwrap();
        assert_eq!(events.last().unwrap().action, AuditAction::PermissionRevoked);
    }
}
