//! Signed access and refresh tokens.
//!
//! The codec holds no state: each call receives the signing secret and,
//! for issuance, the validity duration. Access and refresh tokens are
//! expected to be signed with different secrets.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub user_id: String,
    pub email: String,
    /// Display name
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub user_id: String,
    /// Token ID (matches the stored refresh token record)
    pub token_id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,
}

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issue an access token for a user.
pub fn issue_access_token(
    user_id: &str,
    email: &str,
    name: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();

    let claims = AccessTokenClaims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        iat: now.timestamp(),
        exp: expires_at(now, ttl)?,
    };

    sign(&claims, secret)
}

/// Issue a refresh token bound to a stored token ID.
pub fn issue_refresh_token(
    user_id: &str,
    token_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();

    let claims = RefreshTokenClaims {
        user_id: user_id.to_string(),
        token_id: token_id.to_string(),
        iat: now.timestamp(),
        exp: expires_at(now, ttl)?,
    };

    sign(&claims, secret)
}

/// Verify signature and expiry, then decode the access claims.
pub fn parse_access_token(token: &str, secret: &str) -> Result<AccessTokenClaims, TokenError> {
    verify(token, secret)
}

/// Verify signature and expiry, then decode the refresh claims.
pub fn parse_refresh_token(token: &str, secret: &str) -> Result<RefreshTokenClaims, TokenError> {
    verify(token, secret)
}

fn expires_at(now: DateTime<Utc>, ttl: Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or(TokenError::ExpiryOutOfRange)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::new(SIGNING_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Missing or mistyped claims fail deserialization, so a decoded value is
/// always complete.
fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation())
        .map(|data| data.claims)
        .map_err(TokenError::Invalid)
}

fn validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    // Any HMAC variant is accepted; RSA/EC/"none" headers are rejected.
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}
