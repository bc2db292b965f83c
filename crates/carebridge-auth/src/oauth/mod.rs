//! OAuth 2.0 protocol types.
//!
//! Request/response/error types for the authorization and token
//! endpoints, and the PKCE (RFC 7636) primitives.

pub mod authorize;
pub mod pkce;
pub mod token;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
