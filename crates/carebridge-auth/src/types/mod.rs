//! Domain types for the authorization server.
//!
//! This module defines the persistent entities (clients, permissions,
//! authorization codes, tokens) and the hospital-context value types
//! embedded into issued credentials.

pub mod access_token;
pub mod client;
pub mod code;
pub mod context;
pub mod permission;
pub mod refresh_token;

pub use access_token::AccessToken;
pub use client::{Client, ClientType, ClientValidationError, DataAccessLevel, GrantType};
pub use code::AuthorizationCode;
pub use context::{DataAccessScope, HospitalRole};
pub use permission::ClientPermission;
pub use refresh_token::RefreshToken;
