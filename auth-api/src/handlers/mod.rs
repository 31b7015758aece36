//! HTTP handlers for auth-api.

pub mod auth;
pub mod health;

pub use auth::{login, me, refresh, register};
pub use health::health_check;
