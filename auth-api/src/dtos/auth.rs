use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::services::{AuthResponse, TokenPair};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body returned by register and login: the profile plus a token pair.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponseBody {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl AuthResponseBody {
    pub fn new(res: AuthResponse, expires_in: i64) -> Self {
        Self {
            id: res.user.id,
            name: res.user.name,
            email: res.user.email,
            created_at: res.user.created_at,
            access_token: res.tokens.access_token,
            refresh_token: res.tokens.refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponseBody {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl RefreshResponseBody {
    pub fn new(tokens: TokenPair, expires_in: i64) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in,
        }
    }
}
