//! Shared setup for auth-api integration tests.
//!
//! Everything runs against the in-memory store; no external services.

#![allow(dead_code)]

use async_trait::async_trait;
use auth_api::{
    build_router,
    models::User,
    services::{
        AccountReader, AccountWriter, AuthService, MemoryStore, StorageError, TokenSettings,
    },
    utils::{Password, PasswordHashString},
    AppState,
};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use secrecy::Secret;
use std::sync::Arc;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";
pub const ACCESS_TTL_MINUTES: i64 = 15;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("auth_api=debug")
        .with_test_writer()
        .try_init();
}

pub fn settings() -> TokenSettings {
    TokenSettings::new(
        Duration::minutes(ACCESS_TTL_MINUTES),
        Secret::new(ACCESS_SECRET.to_string()),
        Duration::days(30),
        Secret::new(REFRESH_SECRET.to_string()),
    )
    .expect("Test token settings are valid")
}

pub fn password(p: &str) -> Password {
    Password::new(p)
}

/// Auth service over a fresh in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub service: AuthService,
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let service = AuthService::new(
            tracing::info_span!("test"),
            store.clone(),
            store.clone(),
            settings(),
        );
        Self { store, service }
    }

    /// Same store for reads, but writes go through `writer`.
    pub fn with_writer(writer: Arc<dyn AccountWriter>, store: Arc<MemoryStore>) -> Self {
        init_tracing();
        let service =
            AuthService::new(tracing::info_span!("test"), writer, store.clone(), settings());
        Self { store, service }
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            auth_service: self.service.clone(),
            database: None,
            request_timeout: std::time::Duration::from_secs(5),
        })
    }
}

/// Writer whose refresh token records never persist.
pub struct FailingTokenWriter {
    inner: Arc<MemoryStore>,
}

impl FailingTokenWriter {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AccountWriter for FailingTokenWriter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &PasswordHashString,
    ) -> Result<User, StorageError> {
        self.inner.create_user(name, email, password_hash).await
    }

    async fn save_refresh_token(
        &self,
        _token_id: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Backend(anyhow::anyhow!("disk full")))
    }

    async fn remove_refresh_token(&self, token_id: &str) -> Result<(), StorageError> {
        self.inner.remove_refresh_token(token_id).await
    }
}

/// Reader whose every call fails as if the backend were down.
pub struct UnavailableReader;

#[async_trait]
impl AccountReader for UnavailableReader {
    async fn find_user_by_email(&self, _email: &str) -> Result<User, StorageError> {
        Err(StorageError::Backend(anyhow::anyhow!("connection refused")))
    }

    async fn find_user_by_id(&self, _user_id: Uuid) -> Result<User, StorageError> {
        Err(StorageError::Backend(anyhow::anyhow!("connection refused")))
    }

    async fn refresh_token_owner(&self, _token_id: &str) -> Result<Uuid, StorageError> {
        Err(StorageError::Backend(anyhow::anyhow!("connection refused")))
    }
}
