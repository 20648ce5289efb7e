use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::types::Role;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub school_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, full_name, email, role, school_id, created_at
         FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
