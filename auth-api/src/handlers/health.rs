use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::AppState;

/// Liveness probe; also pings PostgreSQL when the service runs against it.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(db) = &state.database {
        db.health_check().await?;
    }

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
