//! Client credential generation and verification.
//!
//! This module provides cryptographically secure generation of client
//! identifiers and secrets, and Argon2-based hashing for secret storage.
//!
//! # Security
//!
//! - Client IDs are 128-bit random values with a "hos_" prefix
//! - Secrets are 256-bit random values encoded as base64url
//! - Hashing uses Argon2id (hybrid mode) with default parameters
//! - Salts are generated using OsRng (cryptographically secure RNG)
//! - Verification against a missing client runs the same Argon2 work as
//!   verification against a real hash, so both failure paths look alike
//!
//! # Example
//!
//! ```
//! use carebridge_auth::secret::{generate_client_secret, hash_secret, verify_secret};
//!
//! let secret = generate_client_secret();
//! let hash = hash_secret(&secret).unwrap();
//! assert!(verify_secret(&secret, &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use std::sync::OnceLock;

/// Generate a new public client identifier.
///
/// The identifier is 16 random bytes encoded as hexadecimal with a
/// "hos_" prefix for easy identification in logs and dashboards.
///
/// # Format
///
/// `hos_{32 hex characters}` (36 characters total)
#[must_use]
pub fn generate_client_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    format!("hos_{}", hex::encode(bytes))
}

/// Generate a new cryptographically secure client secret.
///
/// Returns a 256-bit random value encoded as base64url (43 characters).
/// The plaintext is returned to the caller exactly once at registration
/// time and is never stored.
#[must_use]
pub fn generate_client_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a client secret for storage using Argon2id.
///
/// Uses a cryptographically secure random salt and the default Argon2id
/// parameters, producing a PHC-formatted string for database storage.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a client secret against a stored Argon2 hash.
///
/// # Returns
///
/// `Ok(true)` if the secret matches, `Ok(false)` if it doesn't.
/// Returns `Err` only if the stored hash format is invalid.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(secret.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

/// Run a verification against a throwaway hash.
///
/// Called when a client lookup misses so that "unknown client" and "wrong
/// secret" cost one Argon2 verification each and return the same outcome.
pub fn verify_against_dummy(secret: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| {
        hash_secret("carebridge-dummy-credential").unwrap_or_default()
    });
    let _ = verify_secret(secret, hash);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_format() {
        let id = generate_client_id();
        assert!(id.starts_with("hos_"));
        assert_eq!(id.len(), 36); // "hos_" + 32 hex chars
        assert!(hex::decode(&id[4..]).is_ok());
    }

    #[test]
    fn test_client_secret_format() {
        let secret = generate_client_secret();
        // 32 bytes base64url encoded = 43 characters, no padding
        assert_eq!(secret.len(), 43);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generation_uniqueness() {
        let ids: Vec<String> = (0..50).map(|_| generate_client_id()).collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());

        assert_ne!(generate_client_secret(), generate_client_secret());
    }

    #[test]
    fn test_hash_and_verify() {
        let secret = generate_client_secret();
        let hash = hash_secret(&secret).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, secret);
        assert!(verify_secret(&secret, &hash).unwrap());
        assert!(!verify_secret("wrong-secret", &hash).unwrap());
    }

    #[test]
    fn test_hash_uses_random_salt() {
        let secret = generate_client_secret();
        let hash1 = hash_secret(&secret).unwrap();
        let hash2 = hash_secret(&secret).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_secret(&secret, &hash1).unwrap());
        assert!(verify_secret(&secret, &hash2).unwrap());
    }

    #[test]
    fn test_verify_invalid_hash_format() {
        assert!(verify_secret("anything", "not-a-phc-hash").is_err());
    }

    #[test]
    fn test_dummy_verification_does_not_panic() {
        verify_against_dummy("whatever");
        verify_against_dummy("");
    }
}
