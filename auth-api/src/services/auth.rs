//! Registration, login, refresh-token rotation and identity resolution.

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::{User, UserProfile};
use crate::services::jwt;
use crate::services::store::{AccountReader, AccountWriter, StorageError};
use crate::services::AuthError;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Longest accepted access token lifetime.
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Longest accepted refresh token lifetime.
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Lifetimes and signing secrets for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    access_ttl: Duration,
    access_secret: Secret<String>,
    refresh_ttl: Duration,
    refresh_secret: Secret<String>,
}

impl TokenSettings {
    /// Secrets must be non-empty and distinct so one token kind can never
    /// be replayed as the other; both lifetimes must be positive and no
    /// longer than [`MAX_ACCESS_TOKEN_TTL_MINUTES`] / [`MAX_REFRESH_TOKEN_TTL_DAYS`].
    pub fn new(
        access_ttl: Duration,
        access_secret: Secret<String>,
        refresh_ttl: Duration,
        refresh_secret: Secret<String>,
    ) -> Result<Self, anyhow::Error> {
        if access_ttl <= Duration::zero() || refresh_ttl <= Duration::zero() {
            anyhow::bail!("Token lifetimes must be positive");
        }
        if access_ttl > Duration::minutes(MAX_ACCESS_TOKEN_TTL_MINUTES) {
            anyhow::bail!(
                "Access token lifetime exceeds {} minutes",
                MAX_ACCESS_TOKEN_TTL_MINUTES
            );
        }
        if refresh_ttl > Duration::days(MAX_REFRESH_TOKEN_TTL_DAYS) {
            anyhow::bail!(
                "Refresh token lifetime exceeds {} days",
                MAX_REFRESH_TOKEN_TTL_DAYS
            );
        }
        if access_secret.expose_secret().is_empty() || refresh_secret.expose_secret().is_empty() {
            anyhow::bail!("Token secrets must not be empty");
        }
        if access_secret.expose_secret() == refresh_secret.expose_secret() {
            anyhow::bail!("Access and refresh secrets must differ");
        }

        Ok(Self {
            access_ttl,
            access_secret,
            refresh_ttl,
            refresh_secret,
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let access_ttl = Duration::try_minutes(config.access_token_expiry_minutes)
            .ok_or_else(|| anyhow::anyhow!("Access token lifetime is out of range"))?;
        let refresh_ttl = Duration::try_days(config.refresh_token_expiry_days)
            .ok_or_else(|| anyhow::anyhow!("Refresh token lifetime is out of range"))?;

        Self::new(
            access_ttl,
            config.access_secret.clone(),
            refresh_ttl,
            config.refresh_secret.clone(),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of register and login.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Stateless auth façade; safe to clone and share across tasks.
#[derive(Clone)]
pub struct AuthService {
    span: Span,
    writer: Arc<dyn AccountWriter>,
    reader: Arc<dyn AccountReader>,
    settings: TokenSettings,
}

impl AuthService {
    /// Every flow runs in a child of `span`.
    pub fn new(
        span: Span,
        writer: Arc<dyn AccountWriter>,
        reader: Arc<dyn AccountReader>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            span,
            writer,
            reader,
            settings,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &Password,
    ) -> Result<AuthResponse, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "auth.register");
        self.register_flow(name, email, password)
            .instrument(span)
            .await
    }

    pub async fn login(&self, email: &str, password: &Password) -> Result<AuthResponse, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "auth.login");
        self.login_flow(email, password).instrument(span).await
    }

    /// Redeem a refresh token for a new pair. The presented token is
    /// consumed before the new pair is issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "auth.refresh");
        self.refresh_flow(refresh_token).instrument(span).await
    }

    /// Resolve an access token to the profile of a still-existing user.
    pub async fn resolve_identity(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "auth.resolve_identity");
        self.resolve_identity_flow(access_token)
            .instrument(span)
            .await
    }

    async fn register_flow(
        &self,
        name: &str,
        email: &str,
        password: &Password,
    ) -> Result<AuthResponse, AuthError> {
        let password_hash = hash_in_background(password.clone()).await?;

        let user = self
            .writer
            .create_user(name, email, &password_hash)
            .await
            .map_err(|e| match e {
                StorageError::UserExists => {
                    tracing::warn!("Registration rejected: email already registered");
                    AuthError::UserExists
                }
                e => {
                    tracing::error!(error = %e, "Failed to save user");
                    AuthError::internal(e)
                }
            })?;

        tracing::info!(user_id = %user.id, "User registered");

        let tokens = self.issue_token_pair(&user).await?;
        Ok(AuthResponse {
            user: user.profile(),
            tokens,
        })
    }

    async fn login_flow(&self, email: &str, password: &Password) -> Result<AuthResponse, AuthError> {
        let user = match self.reader.find_user_by_email(email).await {
            Ok(user) => user,
            Err(StorageError::UserNotFound) => {
                tracing::warn!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load user");
                return Err(AuthError::internal(e));
            }
        };

        if !verify_in_background(password.clone(), user.password_hash()).await? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");

        let tokens = self.issue_token_pair(&user).await?;
        Ok(AuthResponse {
            user: user.profile(),
            tokens,
        })
    }

    async fn refresh_flow(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims =
            jwt::parse_refresh_token(refresh_token, self.settings.refresh_secret.expose_secret())
                .map_err(|e| {
                    tracing::warn!(error = %e, "Refresh rejected: token did not verify");
                    AuthError::InvalidToken
                })?;

        let owner = self
            .reader
            .refresh_token_owner(&claims.token_id)
            .await
            .map_err(|e| match e {
                StorageError::TokenNotFound | StorageError::UserNotFound => {
                    tracing::warn!(token_id = %claims.token_id, "Refresh rejected: token consumed or expired");
                    AuthError::InvalidToken
                }
                e => {
                    tracing::error!(error = %e, "Failed to look up refresh token");
                    AuthError::internal(e)
                }
            })?;

        if owner.to_string() != claims.user_id {
            tracing::warn!(token_id = %claims.token_id, "Refresh rejected: owner mismatch");
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .reader
            .find_user_by_id(owner)
            .await
            .map_err(|e| match e {
                StorageError::UserNotFound => {
                    tracing::warn!(user_id = %owner, "Refresh rejected: user no longer exists");
                    AuthError::InvalidToken
                }
                e => {
                    tracing::error!(error = %e, "Failed to load user");
                    AuthError::internal(e)
                }
            })?;

        // Consume before issuing: of two concurrent redemptions only one
        // can delete the record.
        self.writer
            .remove_refresh_token(&claims.token_id)
            .await
            .map_err(|e| {
                tracing::warn!(token_id = %claims.token_id, error = %e, "Refresh rejected: could not consume token");
                AuthError::InvalidToken
            })?;

        let tokens = self.issue_token_pair(&user).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    async fn resolve_identity_flow(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let claims =
            jwt::parse_access_token(access_token, self.settings.access_secret.expose_secret())
                .map_err(|e| {
                    tracing::debug!(error = %e, "Access token did not verify");
                    AuthError::InvalidToken
                })?;

        let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| AuthError::InvalidToken)?;

        let user = self.reader.find_user_by_id(user_id).await.map_err(|e| {
            tracing::warn!(user_id = %user_id, error = %e, "Access token subject could not be loaded");
            AuthError::InvalidToken
        })?;

        Ok(user.profile())
    }

    /// Sign both tokens and persist the refresh record. Nothing is returned
    /// unless the record is durable.
    async fn issue_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let user_id = user.id.to_string();

        let access_token = jwt::issue_access_token(
            &user_id,
            &user.email,
            &user.name,
            self.settings.access_secret.expose_secret(),
            self.settings.access_ttl,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to sign access token");
            AuthError::internal(e)
        })?;

        let token_id = Uuid::new_v4().to_string();
        let refresh_token = jwt::issue_refresh_token(
            &user_id,
            &token_id,
            self.settings.refresh_secret.expose_secret(),
            self.settings.refresh_ttl,
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to sign refresh token");
            AuthError::internal(e)
        })?;

        let expires_at = Utc::now()
            .checked_add_signed(self.settings.refresh_ttl)
            .ok_or_else(|| {
                tracing::error!("Refresh token expiry is out of range");
                AuthError::internal(jwt::TokenError::ExpiryOutOfRange)
            })?;
        self.writer
            .save_refresh_token(&token_id, user.id, expires_at)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Failed to save refresh token");
                AuthError::internal(e)
            })?;

        tracing::debug!(user_id = %user.id, token_id = %token_id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

/// Argon2 is CPU-bound; keep it off the async worker threads.
async fn hash_in_background(password: Password) -> Result<PasswordHashString, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AuthError::internal)?
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            AuthError::internal(e)
        })
}

async fn verify_in_background(
    password: Password,
    password_hash: PasswordHashString,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(AuthError::internal)?
        .map_err(|e| {
            tracing::error!(error = %e, "Stored password hash is unreadable");
            AuthError::internal(e)
        })
}
