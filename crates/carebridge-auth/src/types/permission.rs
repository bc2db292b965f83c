//! Fine-grained client permission grants.
//!
//! Permissions refine a client's registered scopes down to concrete
//! (scope, resource, action) triples with optional department
//! restrictions and compliance metadata. A client's effective access for
//! an API call requires both the scope registration on the client and an
//! active permission row.
//!
//! Permission rows are never hard-deleted; revocation sets `revoked_at`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Default risk classification for new permission grants.
pub const DEFAULT_RISK_LEVEL: &str = "medium";

/// A fine-grained permission granted to a client.
///
/// Identity is the composite (`client_id`, `scope`, `resource`, `action`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPermission {
    /// Client this permission belongs to.
    pub client_id: String,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// Scope string the permission refines (e.g. `patient:read`).
    pub scope: String,

    /// Resource the permission applies to (e.g. `patient_data`).
    pub resource: String,

    /// Action allowed on the resource (e.g. `read`).
    pub action: String,

    /// Departments this permission is limited to. Empty = unrestricted.
    #[serde(default)]
    pub department_restrictions: Vec<String>,

    /// Data classification label for compliance reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,

    /// PHI access level label for compliance reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phi_access_level: Option<String>,

    /// Risk classification of this grant.
    pub risk_level: String,

    /// Whether compliance review is required for this grant.
    pub compliance_required: bool,

    /// User who granted this permission.
    pub granted_by: String,

    /// When this permission was granted.
    #[serde(with = "time::serde::rfc3339")]
    pub granted_at: OffsetDateTime,

    /// When this permission expires (None = no expiration).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires_at: Option<OffsetDateTime>,

    /// When this permission was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl ClientPermission {
    /// Returns `true` if this permission has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| OffsetDateTime::now_utc() > exp)
            .unwrap_or(false)
    }

    /// Returns `true` if this permission has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this permission is usable (not expired, not revoked).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Returns `true` if this row matches the requested triple exactly.
    #[must_use]
    pub fn matches(&self, scope: &str, resource: &str, action: &str) -> bool {
        self.scope == scope && self.resource == resource && self.action == action
    }

    /// Returns `true` if the given department satisfies this permission's
    /// restriction. An empty restriction list allows any department.
    #[must_use]
    pub fn allows_department(&self, department_id: &str) -> bool {
        self.department_restrictions.is_empty()
            || self
                .department_restrictions
                .iter()
                .any(|d| d == department_id)
    }
}
