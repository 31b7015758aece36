//! Persistence contract consumed by the auth service.
//!
//! Split into a write side and a read side so the service (and its tests)
//! depend only on the operations they call. One store may implement both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;
use crate::utils::PasswordHashString;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("User already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Refresh token not found or expired")]
    TokenNotFound,

    #[error("Failed to save refresh token")]
    TokenSaveFailed,

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccountWriter: Send + Sync {
    /// Fails with `UserExists` when the email is already registered.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &PasswordHashString,
    ) -> Result<User, StorageError>;

    async fn save_refresh_token(
        &self,
        token_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Deletes the record; `TokenNotFound` if nothing was deleted.
    async fn remove_refresh_token(&self, token_id: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AccountReader: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StorageError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<User, StorageError>;

    /// Owner of a live refresh token record.
    ///
    /// Records whose expiry is not strictly after the current time are
    /// treated as absent (`TokenNotFound`).
    async fn refresh_token_owner(&self, token_id: &str) -> Result<Uuid, StorageError>;
}
