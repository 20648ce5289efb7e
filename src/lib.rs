pub mod access;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod queries;
pub mod recurrence;
pub mod response;
pub mod routes;
pub mod types;

use axum::Router;
use sqlx::SqlitePool;

pub use config::Config;
pub use routes::AppState;

/// Assemble the application router from a pool and configuration.
/// Integration tests call this directly against an in-memory database.
pub fn create_app(pool: SqlitePool, config: Config) -> Router {
    routes::router(AppState { pool, config })
}
