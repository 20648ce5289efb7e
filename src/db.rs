use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Configure SQLite PRAGMAs for optimal performance with WAL mode
///
/// - WAL mode enables concurrent reads and writes
/// - busy_timeout reduces SQLITE_BUSY errors
/// - synchronous=NORMAL is safe with WAL and improves performance
/// - foreign_keys must be explicitly enabled (disabled by default)
async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = true")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA temp_store = memory")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create a pool with optimized PRAGMAs
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    configure_pragmas(&pool).await?;

    tracing::info!("Created pool with {} max connections", max_connections);

    Ok(pool)
}

/// Apply the schema migrations under ./migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_applies_pragmas() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();

        let foreign_keys: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(foreign_keys.0, 1);

        let temp_store: (i32,) = sqlx::query_as("PRAGMA temp_store")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(temp_store.0, 2); // 2 = memory
    }

    #[tokio::test]
    async fn test_migrations_apply_cleanly() {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let menu_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM menus")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(menu_count.0, 0);
    }
}
