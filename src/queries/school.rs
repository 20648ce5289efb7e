use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SchoolRow {
    pub id: String,
    pub name: String,
    pub admin_id: Option<String>,
}

pub async fn get_school(
    pool: &SqlitePool,
    school_id: &str,
) -> Result<Option<SchoolRow>, sqlx::Error> {
    sqlx::query_as::<_, SchoolRow>("SELECT id, name, admin_id FROM schools WHERE id = ?")
        .bind(school_id)
        .fetch_optional(pool)
        .await
}

/// The single school administered by this user, if any. Looked up fresh on
/// every call so a reassigned admin loses access immediately.
pub async fn school_for_admin(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM schools WHERE admin_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Distinct schools across all of a parent's linked students.
pub async fn schools_for_parent(
    pool: &SqlitePool,
    parent_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT school_id FROM students WHERE parent_id = ?")
        .bind(parent_id)
        .fetch_all(pool)
        .await
}
