use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::types::{PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentRow {
    pub id: String,
    pub subscription_id: String,
    pub parent_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub verification_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewPayment<'a> {
    pub subscription_id: &'a str,
    pub parent_id: &'a str,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<&'a str>,
    pub verification_code: Option<&'a str>,
}

pub async fn insert_payment(
    pool: &SqlitePool,
    new: &NewPayment<'_>,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO payments (id, subscription_id, parent_id, amount, method, status, reference, \
         verification_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(new.subscription_id)
    .bind(new.parent_id)
    .bind(new.amount)
    .bind(new.method)
    .bind(new.status)
    .bind(new.reference)
    .bind(new.verification_code)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn get_payment(
    pool: &SqlitePool,
    payment_id: &str,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT id, subscription_id, parent_id, amount, method, status, reference, \
         verification_code, created_at, updated_at FROM payments WHERE id = ?",
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await
}

pub async fn set_payment_status(
    pool: &SqlitePool,
    payment_id: &str,
    status: PaymentStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE payments SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(payment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
