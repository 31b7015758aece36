//! Refresh token record - the durable half of a refresh token.
//!
//! Only the token ID is stored; the signed token string never is.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub token_id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(token_id: String, user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_id,
            user_id,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// A record is redeemable only while its expiry is strictly in the future.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
