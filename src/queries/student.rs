use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: String,
    pub school_id: String,
    pub parent_id: Option<String>,
    pub full_name: String,
}

pub async fn get_student(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Option<StudentRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentRow>(
        "SELECT id, school_id, parent_id, full_name FROM students WHERE id = ?",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
