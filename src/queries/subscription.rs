use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::SubscriptionStatus;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SubscriptionRow {
    pub id: String,
    pub student_id: String,
    pub plan: String,
    pub price: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewSubscription<'a> {
    pub student_id: &'a str,
    pub plan: &'a str,
    pub price: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,
}

pub async fn insert_subscription(
    pool: &SqlitePool,
    new: &NewSubscription<'_>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO subscriptions (id, student_id, plan, price, start_date, end_date, status, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(new.student_id)
    .bind(new.plan)
    .bind(new.price)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn get_subscription(
    pool: &SqlitePool,
    subscription_id: &str,
) -> Result<Option<SubscriptionRow>, sqlx::Error> {
    sqlx::query_as::<_, SubscriptionRow>(
        "SELECT id, student_id, plan, price, start_date, end_date, status, created_at, updated_at
         FROM subscriptions WHERE id = ?",
    )
    .bind(subscription_id)
    .fetch_optional(pool)
    .await
}

/// Unconditional status overwrite. Concurrent writers race and the last one
/// wins; there is no version check.
pub async fn set_subscription_status(
    pool: &SqlitePool,
    subscription_id: &str,
    status: SubscriptionStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE subscriptions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(subscription_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn subscription_has_payments(
    pool: &SqlitePool,
    subscription_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE subscription_id = ?)")
        .bind(subscription_id)
        .fetch_one(pool)
        .await
}

pub async fn delete_subscription(
    pool: &SqlitePool,
    subscription_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = ?")
        .bind(subscription_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
