use service_core::{
    axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{AuthResponseBody, LoginRequest, RefreshRequest, RefreshResponseBody, RegisterRequest},
    models::UserProfile,
    utils::{Password, ValidatedJson},
    AppState,
};

/// Register a new account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .auth_service
        .register(&req.name, &req.email, &Password::new(req.password))
        .await?;

    let body = AuthResponseBody::new(res, state.access_token_expires_in());
    Ok((StatusCode::CREATED, Json(body)))
}

/// Login with email and password.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state
        .auth_service
        .login(&req.email, &Password::new(req.password))
        .await?;

    let body = AuthResponseBody::new(res, state.access_token_expires_in());
    Ok((StatusCode::OK, Json(body)))
}

/// Trade a refresh token for a new pair. The presented token stops working.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.auth_service.refresh(&req.refresh_token).await?;

    let body = RefreshResponseBody::new(tokens, state.access_token_expires_in());
    Ok((StatusCode::OK, Json(body)))
}

/// Profile of the bearer of the access token.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AppError> {
    let token = bearer_token(&headers).ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
    })?;

    let profile = state.auth_service.resolve_identity(token).await?;
    Ok(Json(profile))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
