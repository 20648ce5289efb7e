//! Append-only notification sink. Other components record events here; a
//! delivery mechanism (push, email) is someone else's problem.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::NotificationKind;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub student_id: Option<String>,
    pub menu_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: &'a str,
    pub student_id: Option<&'a str>,
    pub menu_id: Option<&'a str>,
}

pub async fn insert_notification(
    pool: &SqlitePool,
    new: &NewNotification<'_>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, title, message, student_id, menu_id, \
         is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(new.user_id)
    .bind(new.kind)
    .bind(new.title)
    .bind(new.message)
    .bind(new.student_id)
    .bind(new.menu_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Best-effort insert: a failed notification must never fail the mutation
/// that triggered it.
pub async fn record_best_effort(pool: &SqlitePool, new: &NewNotification<'_>) {
    if let Err(e) = insert_notification(pool, new).await {
        tracing::warn!(
            user_id = %new.user_id,
            kind = %new.kind,
            error = %e,
            "Failed to record notification"
        );
    }
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<NotificationRow>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRow>(
        "SELECT id, user_id, kind, title, message, student_id, menu_id, is_read, created_at
         FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Marks one of the caller's own notifications as read. Scoping by user id
/// keeps one user from touching another's inbox.
pub async fn mark_read(
    pool: &SqlitePool,
    notification_id: &str,
    user_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
