//! Hospital authorization context types.
//!
//! Departments and hospital roles are tenant-specific authorization
//! dimensions layered on top of standard OAuth scopes. They are captured
//! at authorization time and embedded into issued codes and tokens.

use serde::{Deserialize, Serialize};

/// Hospital job function associated with an authorization.
///
/// Restricts what an application may do on behalf of the signed-in staff
/// member beyond plain OAuth scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HospitalRole {
    /// Full administrative access.
    Administrator,
    /// Physician-level clinical access.
    Doctor,
    /// Nursing staff access.
    Nurse,
    /// Technical/laboratory staff access.
    Technician,
    /// Read-only access.
    Viewer,
}

impl HospitalRole {
    /// Parses a role from its request-parameter value.
    ///
    /// Returns `None` for unknown values; callers translate that into an
    /// `invalid_request` error.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "administrator" => Some(Self::Administrator),
            "doctor" => Some(Self::Doctor),
            "nurse" => Some(Self::Nurse),
            "technician" => Some(Self::Technician),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Returns the request-parameter value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Doctor => "doctor",
            Self::Nurse => "nurse",
            Self::Technician => "technician",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for HospitalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured data-access scope carried inside codes and tokens.
///
/// The `data_access_scope` request parameter arrives as URL-encoded JSON;
/// it is validated into this structure at the authorization endpoint so
/// downstream consumers get typed fields instead of an open-ended map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataAccessScope {
    /// Whether the authorization covers protected health information.
    pub phi_access: bool,

    /// Whether accesses under this authorization must be audit-logged.
    pub audit_required: bool,

    /// Department identifiers this authorization is limited to.
    /// Empty means no department-level narrowing.
    pub department_scope: Vec<String>,
}

impl DataAccessScope {
    /// Parses the URL-decoded JSON value of the `data_access_scope` parameter.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the value is not valid JSON
    /// for this structure.
    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
