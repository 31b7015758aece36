//! PostgreSQL store for auth-api.
//!
//! Implements both store contracts over a single connection pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::User;
use crate::services::store::{AccountReader, AccountWriter, StorageError};
use crate::utils::PasswordHashString;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    /// Delete refresh token records that can no longer be redeemed.
    pub async fn purge_expired_refresh_tokens(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "Purged expired refresh tokens");
        }
        Ok(purged)
    }
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(anyhow::anyhow!(e))
}

fn is_constraint_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.is_foreign_key_violation()
        }
        _ => false,
    }
}

#[async_trait]
impl AccountWriter for Database {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &PasswordHashString,
    ) -> Result<User, StorageError> {
        let user = User::new(name.to_string(), email.to_string(), password_hash.clone());

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StorageError::UserExists
            }
            e => backend(e),
        })
    }

    async fn save_refresh_token(
        &self,
        token_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StorageError::TokenSaveFailed
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn remove_refresh_token(&self, token_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        // Zero rows means another request already consumed it.
        if result.rows_affected() == 0 {
            return Err(StorageError::TokenNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountReader for Database {
    async fn find_user_by_email(&self, email: &str) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StorageError::UserNotFound)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StorageError::UserNotFound)
    }

    async fn refresh_token_owner(&self, token_id: &str) -> Result<Uuid, StorageError> {
        // Application clock, so every store applies the same expiry rule.
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM refresh_tokens WHERE token_id = $1 AND expires_at > $2",
        )
        .bind(token_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StorageError::TokenNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db;
    use chrono::Duration;

    async fn connect() -> Database {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/auth_test".to_string()),
            max_connections: 5,
            min_connections: 1,
        };
        let pool = db::create_pool(&config).await.expect("Failed to connect");
        db::run_migrations(&pool).await.expect("Failed to migrate");
        Database::new(pool)
    }

    fn unique_email() -> String {
        format!("user-{}@example.com", Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_duplicate_email_maps_to_user_exists() {
        let db = connect().await;
        let email = unique_email();
        let hash = PasswordHashString::new("hash");

        db.create_user("A", &email, &hash).await.unwrap();
        assert!(matches!(
            db.create_user("B", &email, &hash).await,
            Err(StorageError::UserExists)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_refresh_token_is_removed_once() {
        let db = connect().await;
        let user = db
            .create_user("A", &unique_email(), &PasswordHashString::new("hash"))
            .await
            .unwrap();
        let token_id = Uuid::new_v4().to_string();

        db.save_refresh_token(&token_id, user.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(db.refresh_token_owner(&token_id).await.unwrap(), user.id);

        db.remove_refresh_token(&token_id).await.unwrap();
        assert!(matches!(
            db.remove_refresh_token(&token_id).await,
            Err(StorageError::TokenNotFound)
        ));
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_expired_refresh_token_has_no_owner() {
        let db = connect().await;
        let user = db
            .create_user("A", &unique_email(), &PasswordHashString::new("hash"))
            .await
            .unwrap();
        let token_id = Uuid::new_v4().to_string();

        db.save_refresh_token(&token_id, user.id, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        assert!(matches!(
            db.refresh_token_owner(&token_id).await,
            Err(StorageError::TokenNotFound)
        ));
        assert!(db.purge_expired_refresh_tokens().await.unwrap() >= 1);
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_token_for_unknown_user_fails_to_save() {
        let db = connect().await;
        let result = db
            .save_refresh_token(
                &Uuid::new_v4().to_string(),
                Uuid::new_v4(),
                Utc::now() + Duration::days(1),
            )
            .await;

        assert!(matches!(result, Err(StorageError::TokenSaveFailed)));
    }
}
