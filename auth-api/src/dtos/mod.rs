pub mod auth;

pub use auth::{
    AuthResponseBody, LoginRequest, RefreshRequest, RefreshResponseBody, RegisterRequest,
};
