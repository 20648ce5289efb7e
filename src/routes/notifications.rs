//! Notification inbox routes. Every caller only ever sees their own rows.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::notification::{list_for_user, mark_read, NotificationRow};
use crate::response::ApiResponse;
use crate::routes::AppState;

/// GET /notifications — the caller's inbox, newest first.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<NotificationRow>>>, AppError> {
    let notifications = list_for_user(&state.pool, &caller.id).await?;
    Ok(ApiResponse::ok(notifications))
}

/// POST /notifications/{id}/read
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, notification_id = %notification_id))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(notification_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let affected = mark_read(&state.pool, &notification_id, &caller.id).await?;
    if affected == 0 {
        return Err(AppError::not_found("Notification"));
    }
    Ok(ApiResponse::message("Notification marked as read"))
}
