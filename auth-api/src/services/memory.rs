//! In-process implementation of both store contracts.
//!
//! Same semantics as the PostgreSQL store: unique emails, strict expiry
//! filter and delete-once refresh tokens. Each operation runs under a
//! single lock, so conflicting writes to one token ID are serialized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{RefreshTokenRecord, User};
use crate::services::store::{AccountReader, AccountWriter, StorageError};
use crate::utils::PasswordHashString;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Backend(anyhow::anyhow!("Memory store mutex poisoned: {}", e)))
    }

    /// Number of stored refresh token records, live or not.
    pub fn refresh_token_count(&self) -> usize {
        self.lock().map(|t| t.refresh_tokens.len()).unwrap_or(0)
    }

    /// Drop records that can no longer be redeemed.
    pub fn purge_expired_refresh_tokens(&self) -> Result<u64, StorageError> {
        let now = Utc::now();
        let mut tables = self.lock()?;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, record| record.is_live_at(now));
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl AccountWriter for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &PasswordHashString,
    ) -> Result<User, StorageError> {
        let mut tables = self.lock()?;

        if tables.users.values().any(|u| u.email == email) {
            return Err(StorageError::UserExists);
        }

        let user = User::new(name.to_string(), email.to_string(), password_hash.clone());
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_refresh_token(
        &self,
        token_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut tables = self.lock()?;

        if !tables.users.contains_key(&user_id) || tables.refresh_tokens.contains_key(token_id) {
            return Err(StorageError::TokenSaveFailed);
        }

        tables.refresh_tokens.insert(
            token_id.to_string(),
            RefreshTokenRecord::new(token_id.to_string(), user_id, expires_at),
        );
        Ok(())
    }

    async fn remove_refresh_token(&self, token_id: &str) -> Result<(), StorageError> {
        self.lock()?
            .refresh_tokens
            .remove(token_id)
            .map(|_| ())
            .ok_or(StorageError::TokenNotFound)
    }
}

#[async_trait]
impl AccountReader for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StorageError> {
        self.lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<User, StorageError> {
        self.lock()?
            .users
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }

    async fn refresh_token_owner(&self, token_id: &str) -> Result<Uuid, StorageError> {
        let now = Utc::now();
        self.lock()?
            .refresh_tokens
            .get(token_id)
            .filter(|record| record.is_live_at(now))
            .map(|record| record.user_id)
            .ok_or(StorageError::TokenNotFound)
    }
}
