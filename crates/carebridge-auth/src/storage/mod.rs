//! Storage traits for auth-related data.
//!
//! These traits define the persistence ports the services are built
//! against. Implementations are provided by storage backend crates
//! (e.g. `carebridge-auth-memory` for tests and development).

pub mod client;
pub mod code;
pub mod permission;
pub mod token;

pub use client::ClientStore;
pub use code::AuthorizationCodeStore;
pub use permission::PermissionStore;
pub use token::{AccessTokenStore, RefreshTokenStore};
