//! Security event audit logging.
//!
//! Every mutating operation in the client and token layers emits one
//! audit event after the state change succeeds. Delivery failures
//! propagate to the caller: for PHI-accessing clients, losing an audit
//! entry is a compliance failure, so sinks that need buffering or retry
//! implement it behind the [`AuditSink`] trait.
//!
//! Event metadata never contains client secrets or full token values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuthResult;

// =============================================================================
// Audit Actions
// =============================================================================

/// Security-relevant actions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// A client was registered.
    ClientCreated,
    /// A client's configuration was changed.
    ClientUpdated,
    /// A client was retired (soft delete).
    ClientRevoked,
    /// A fine-grained permission was granted to a client.
    PermissionGranted,
    /// A fine-grained permission was revoked.
    PermissionRevoked,
    /// An authorization code was issued.
    CodeIssued,
    /// An authorization code was redeemed for tokens.
    CodeRedeemed,
    /// An access token (and optionally a refresh token) was issued.
    TokenIssued,
    /// A refresh token was rotated into a fresh token pair.
    TokenRefreshed,
    /// Tokens were revoked (rotation or cleanup).
    TokenRevoked,
}

impl AuditAction {
    /// Returns the dotted action name recorded in the log.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCreated => "oauth.client.created",
            Self::ClientUpdated => "oauth.client.updated",
            Self::ClientRevoked => "oauth.client.revoked",
            Self::PermissionGranted => "oauth.permission.granted",
            Self::PermissionRevoked => "oauth.permission.revoked",
            Self::CodeIssued => "oauth.code.issued",
            Self::CodeRedeemed => "oauth.code.redeemed",
            Self::TokenIssued => "oauth.token.issued",
            Self::TokenRefreshed => "oauth.token.refreshed",
            Self::TokenRevoked => "oauth.token.revoked",
        }
    }

    /// Returns the CRUD classification of this action.
    #[must_use]
    pub fn crud(&self) -> AuditCrud {
        match self {
            Self::ClientCreated
            | Self::PermissionGranted
            | Self::CodeIssued
            | Self::TokenIssued => AuditCrud::Create,
            Self::ClientUpdated | Self::CodeRedeemed | Self::TokenRefreshed => AuditCrud::Update,
            Self::ClientRevoked | Self::PermissionRevoked | Self::TokenRevoked => {
                AuditCrud::Delete
            }
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CRUD classification for audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditCrud {
    /// A record was created.
    Create,
    /// A record was read.
    Read,
    /// A record was modified.
    Update,
    /// A record was retired or revoked.
    Delete,
}

// =============================================================================
// Audit Event
// =============================================================================

/// One append-only audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Organization (tenant) the action happened in.
    pub organization_id: String,

    /// Identity that performed the action. "system" for operations
    /// without a user actor (token endpoint calls, cleanup).
    pub actor_id: String,

    /// What happened.
    pub action: AuditAction,

    /// Entity kind the action applies to (e.g. "oauth_client").
    pub resource: String,

    /// Identifier of the affected entity.
    pub resource_id: String,

    /// Display name of the affected entity, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    /// Structured action detail. Never contains secrets or full tokens.
    pub metadata: Value,
}

impl AuditEvent {
    /// Creates a new audit event.
    #[must_use]
    pub fn new(
        organization_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: AuditAction,
        resource: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            actor_id: actor_id.into(),
            action,
            resource: resource.into(),
            resource_id: resource_id.into(),
            resource_name: None,
            metadata: Value::Null,
        }
    }

    /// Sets the resource display name.
    #[must_use]
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    /// Sets the structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// =============================================================================
// Audit Sink
// =============================================================================

/// Append-only sink for audit events.
///
/// Implementations must be durable enough for compliance review;
/// at-least-once delivery is expected.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be delivered. Callers
    /// treat this as a failure of the overall operation.
    async fn record(&self, event: AuditEvent) -> AuthResult<()>;
}

/// Audit sink that emits events as structured tracing records.
///
/// Suitable for deployments that collect audit data from the log
/// pipeline. Production deployments with stricter durability needs
/// provide their own sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> AuthResult<()> {
        tracing::info!(
            target: "carebridge_audit",
            organization_id = %event.organization_id,
            actor_id = %event.actor_id,
            action = %event.action,
            crud = ?event.action.crud(),
            resource = %event.resource,
            resource_id = %event.resource_id,
            metadata = %event.metadata,
            "audit event"
        );
        Ok(())
    }
}
