#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use cantine::config::{Config, DatabaseConfig, FeatureConfig, ObservabilityConfig, ServerConfig};
use cantine::{create_app, db};

pub fn test_config(payment_simulation: bool) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        observability: ObservabilityConfig::default(),
        features: FeatureConfig { payment_simulation },
    }
}

/// In-memory database plus a fully wired app. A single connection keeps
/// every query on the same in-memory database.
pub async fn setup() -> (Router, SqlitePool) {
    setup_with(test_config(true)).await
}

pub async fn setup_with(config: Config) -> (Router, SqlitePool) {
    let pool = db::create_pool("sqlite::memory:", 1).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let app = create_app(pool.clone(), config);
    (app, pool)
}

/// Fires one request at the router and decodes the JSON envelope.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn seed_user(pool: &SqlitePool, id: &str, role: &str, school_id: Option<&str>) {
    sqlx::query(
        "INSERT INTO users (id, full_name, email, role, school_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(format!("User {id}"))
    .bind(format!("{id}@example.com"))
    .bind(role)
    .bind(school_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_school(pool: &SqlitePool, id: &str, admin_id: Option<&str>) {
    sqlx::query("INSERT INTO schools (id, name, admin_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("School {id}"))
        .bind(admin_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_student(pool: &SqlitePool, id: &str, school_id: &str, parent_id: Option<&str>) {
    sqlx::query("INSERT INTO students (id, school_id, parent_id, full_name) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(school_id)
        .bind(parent_id)
        .bind(format!("Student {id}"))
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_subscription(pool: &SqlitePool, id: &str, student_id: &str, status: &str) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO subscriptions (id, student_id, plan, price, start_date, end_date, status, \
         created_at, updated_at) VALUES (?, ?, 'MONTHLY', 25000.0, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(student_id)
    .bind(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    .bind(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap())
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

/// Single ad hoc menu (no series key).
pub async fn seed_menu(
    pool: &SqlitePool,
    id: &str,
    school_id: &str,
    date: NaiveDate,
    meal_type: &str,
    status: &str,
    created_by: &str,
) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO menus (id, school_id, menu_date, meal_type, description, items, allergens, \
         status, created_by, annual_key, is_annual, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'Seeded menu', '[\"rice\"]', '[]', ?, ?, NULL, 0, ?, ?)",
    )
    .bind(id)
    .bind(school_id)
    .bind(date)
    .bind(meal_type)
    .bind(status)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .unwrap();
}

/// One school (s1, admin sa1) with canteen staff, a parent and a student.
pub async fn seed_core(pool: &SqlitePool) {
    seed_user(pool, "admin1", "ADMIN", None).await;
    seed_user(pool, "sa1", "SCHOOL_ADMIN", None).await;
    seed_user(pool, "staff1", "CANTEEN_STAFF", Some("s1")).await;
    seed_user(pool, "parent1", "PARENT", None).await;
    seed_school(pool, "s1", Some("sa1")).await;
    seed_student(pool, "st1", "s1", Some("parent1")).await;
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

pub async fn scalar_text(pool: &SqlitePool, sql: &str) -> String {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
