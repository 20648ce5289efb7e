use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "cantine" }))
}

/// Readiness probe: verifies the database answers.
pub async fn ready(State(pool): State<SqlitePool>) -> Result<Json<Value>, StatusCode> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    Ok(Json(json!({ "status": "ready" })))
}
