use service_core::error::AppError;
use thiserror::Error;

/// Outcome classes exposed by [`AuthService`](super::AuthService).
///
/// Storage and crypto failures never leave the service unclassified.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User already exists")]
    UserExists,

    /// The cause is kept for logs only and is not part of the message.
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AuthError::Internal(err.into())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            AuthError::InvalidToken => AppError::Unauthorized(anyhow::anyhow!("Invalid token")),
            AuthError::UserExists => AppError::Conflict(anyhow::anyhow!("User already exists")),
            AuthError::Internal(e) => AppError::InternalError(e),
        }
    }
}
