//! Authorization server configuration.
//!
//! Configuration is deserialized from the host application's config file
//! (TOML) and covers token lifetimes, issuer identity, and audit settings.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "https://auth.hospital.example.com"
//! audience = "https://api.hospital.example.com"
//!
//! [auth.oauth]
//! authorization_code_lifetime = "10m"
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "24h"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authorization server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server issuer URL (recorded as the `issuer` of every access token).
    pub issuer: String,

    /// Default audience URL for issued tokens.
    pub audience: String,

    /// OAuth 2.0 protocol configuration.
    pub oauth: OAuthConfig,

    /// Audit configuration.
    pub audit: AuditConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: "http://localhost:8080/api".to_string(),
            oauth: OAuthConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

/// OAuth 2.0 protocol configuration.
///
/// Controls credential lifetimes and refresh token behavior. Per-client
/// overrides on the client record take precedence over these defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime.
    /// Codes should be short-lived for security.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Default access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Default refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            access_token_lifetime: Duration::from_secs(3600),      // 1 hour
            refresh_token_lifetime: Duration::from_secs(86400),    // 24 hours
        }
    }
}

/// Audit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit event emission.
    ///
    /// Disabling this is only acceptable in development; clients registered
    /// with PHI access always require audit delivery.
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(
            config.oauth.authorization_code_lifetime,
            Duration::from_secs(600)
        );
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(3600));
        assert_eq!(
            config.oauth.refresh_token_lifetime,
            Duration::from_secs(86400)
        );
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_deserialize_humantime_durations() {
        let json = serde_json::json!({
            "issuer": "https://auth.hospital.example.com",
            "audience": "https://api.hospital.example.com",
            "oauth": {
                "authorization_code_lifetime": "5m",
                "access_token_lifetime": "30m",
                "refresh_token_lifetime": "12h"
            }
        });

        let config: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.issuer, "https://auth.hospital.example.com");
        assert_eq!(
            config.oauth.authorization_code_lifetime,
            Duration::from_secs(300)
        );
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(1800));
        assert_eq!(
            config.oauth.refresh_token_lifetime,
            Duration::from_secs(43200)
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let json = serde_json::json!({ "issuer": "https://auth.example.com" });
        let config: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.issuer, "https://auth.example.com");
        // Omitted sections fall back to defaults
        assert_eq!(config.oauth.access_token_lifetime, Duration::from_secs(3600));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = AuthConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        let parsed: AuthConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.issuer, config.issuer);
        assert_eq!(
            parsed.oauth.refresh_token_lifetime,
            config.oauth.refresh_token_lifetime
        );
    }
}
