//! Services layer for auth-api.
//!
//! Token codec, store contracts with their PostgreSQL and in-memory
//! implementations, and the orchestrator that ties them together.

pub mod auth;
mod database;
pub mod error;
pub mod jwt;
mod memory;
pub mod purge;
pub mod store;

pub use auth::{AuthResponse, AuthService, TokenPair, TokenSettings};
pub use database::Database;
pub use error::AuthError;
pub use jwt::{AccessTokenClaims, RefreshTokenClaims, TokenError};
pub use memory::MemoryStore;
pub use purge::purge_periodically;
pub use store::{AccountReader, AccountWriter, StorageError};
