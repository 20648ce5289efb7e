use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::types::{MealType, MenuStatus};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MenuRow {
    pub id: String,
    pub school_id: String,
    pub menu_date: NaiveDate,
    pub meal_type: MealType,
    pub description: String,
    pub items: Json<Vec<String>>,
    pub allergens: Json<Vec<String>>,
    pub status: MenuStatus,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub annual_key: Option<String>,
    pub is_annual: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const MENU_COLUMNS: &str = "id, school_id, menu_date, meal_type, description, items, allergens, \
     status, created_by, approved_by, approved_at, rejection_reason, annual_key, is_annual, \
     created_at, updated_at";

/// One day of an annual series, written by the recurrence engine.
#[derive(Debug)]
pub struct MenuDayUpsert<'a> {
    pub school_id: &'a str,
    pub menu_date: NaiveDate,
    pub meal_type: MealType,
    pub description: &'a str,
    pub items: &'a [String],
    pub allergens: &'a [String],
    pub created_by: &'a str,
    pub annual_key: &'a str,
}

/// Find-or-create keyed on (school, meal type, calendar day). A conflict
/// overwrites that day's content instead of duplicating it, which is what
/// makes re-running an annual creation call idempotent.
pub async fn upsert_day(pool: &SqlitePool, day: &MenuDayUpsert<'_>) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO menus (id, school_id, menu_date, meal_type, description, items, allergens, \
         status, created_by, approved_by, approved_at, rejection_reason, annual_key, is_annual, \
         created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, 1, ?, ?)
         ON CONFLICT (school_id, meal_type, menu_date) DO UPDATE SET
             description = excluded.description,
             items = excluded.items,
             allergens = excluded.allergens,
             status = excluded.status,
             approved_by = excluded.approved_by,
             approved_at = excluded.approved_at,
             rejection_reason = NULL,
             annual_key = excluded.annual_key,
             is_annual = 1,
             updated_at = excluded.updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(day.school_id)
    .bind(day.menu_date)
    .bind(day.meal_type)
    .bind(day.description)
    .bind(Json(day.items))
    .bind(Json(day.allergens))
    .bind(MenuStatus::Approved)
    .bind(day.created_by)
    .bind(day.created_by) // auto-approved by the creating role
    .bind(now)
    .bind(day.annual_key)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Menu joined with the display names of its school and creator, for
/// responses that should not force the client into follow-up lookups.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct MenuDetailRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub menu: MenuRow,
    pub school_name: String,
    pub created_by_name: String,
}

pub async fn menu_with_display(
    pool: &SqlitePool,
    menu_id: &str,
) -> Result<Option<MenuDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, MenuDetailRow>(
        "SELECT m.*, s.name AS school_name, u.full_name AS created_by_name
         FROM menus m
         JOIN schools s ON s.id = m.school_id
         JOIN users u ON u.id = m.created_by
         WHERE m.id = ?",
    )
    .bind(menu_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_menu(pool: &SqlitePool, menu_id: &str) -> Result<Option<MenuRow>, sqlx::Error> {
    sqlx::query_as::<_, MenuRow>(&format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = ?"))
        .bind(menu_id)
        .fetch_optional(pool)
        .await
}

pub async fn menu_for_day(
    pool: &SqlitePool,
    school_id: &str,
    meal_type: MealType,
    menu_date: NaiveDate,
) -> Result<Option<MenuRow>, sqlx::Error> {
    sqlx::query_as::<_, MenuRow>(&format!(
        "SELECT {MENU_COLUMNS} FROM menus WHERE school_id = ? AND meal_type = ? AND menu_date = ?"
    ))
    .bind(school_id)
    .bind(meal_type)
    .bind(menu_date)
    .fetch_optional(pool)
    .await
}

/// Listing filter. `school_ids: None` means the caller is unrestricted.
#[derive(Debug, Default)]
pub struct MenuListFilter {
    pub school_ids: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
    pub status: Option<MenuStatus>,
}

pub async fn list_menus(
    pool: &SqlitePool,
    filter: &MenuListFilter,
) -> Result<Vec<MenuRow>, sqlx::Error> {
    if let Some(ids) = &filter.school_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {MENU_COLUMNS} FROM menus WHERE 1 = 1"));

    if let Some(ids) = &filter.school_ids {
        qb.push(" AND school_id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        qb.push(")");
    }
    if let Some(date) = filter.date {
        qb.push(" AND menu_date = ").push_bind(date);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    qb.push(" ORDER BY menu_date, meal_type");

    qb.build_query_as::<MenuRow>().fetch_all(pool).await
}

/// Approved menus for the 7-day window starting at `start`.
pub async fn approved_week(
    pool: &SqlitePool,
    school_id: &str,
    start: NaiveDate,
) -> Result<Vec<MenuRow>, sqlx::Error> {
    sqlx::query_as::<_, MenuRow>(&format!(
        "SELECT {MENU_COLUMNS} FROM menus
         WHERE school_id = ? AND status = ? AND menu_date >= ? AND menu_date < ?
         ORDER BY menu_date, meal_type"
    ))
    .bind(school_id)
    .bind(MenuStatus::Approved)
    .bind(start)
    .bind(start + Duration::days(7))
    .fetch_all(pool)
    .await
}

/// Caller-editable content. Server-managed fields (ids, creator, approver,
/// timestamps) have no representation here and so can never be tampered with.
#[derive(Debug, Default)]
pub struct MenuContentUpdate<'a> {
    pub description: Option<&'a str>,
    pub items: Option<&'a [String]>,
    pub allergens: Option<&'a [String]>,
}

/// Fan a content update out to every document sharing the series key. The
/// whole series is forced back to APPROVED with the acting caller recorded
/// as approver; dates are left untouched.
pub async fn update_series(
    pool: &SqlitePool,
    annual_key: &str,
    update: &MenuContentUpdate<'_>,
    approver: &str,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE menus SET
             description = COALESCE(?, description),
             items = COALESCE(?, items),
             allergens = COALESCE(?, allergens),
             status = ?,
             approved_by = ?,
             approved_at = ?,
             rejection_reason = NULL,
             updated_at = ?
         WHERE annual_key = ?",
    )
    .bind(update.description)
    .bind(update.items.map(Json))
    .bind(update.allergens.map(Json))
    .bind(MenuStatus::Approved)
    .bind(approver)
    .bind(now)
    .bind(now)
    .bind(annual_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Update a single ad hoc menu. Unlike series records the date may change;
/// the approval status is left as-is.
pub async fn update_single(
    pool: &SqlitePool,
    menu_id: &str,
    update: &MenuContentUpdate<'_>,
    menu_date: Option<NaiveDate>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE menus SET
             description = COALESCE(?, description),
             items = COALESCE(?, items),
             allergens = COALESCE(?, allergens),
             menu_date = COALESCE(?, menu_date),
             updated_at = ?
         WHERE id = ?",
    )
    .bind(update.description)
    .bind(update.items.map(Json))
    .bind(update.allergens.map(Json))
    .bind(menu_date)
    .bind(Utc::now())
    .bind(menu_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Record an approval decision. Status gating happens in the handler; this
/// only writes the outcome.
pub async fn record_decision(
    pool: &SqlitePool,
    menu_id: &str,
    status: MenuStatus,
    approver: &str,
    rejection_reason: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE menus SET status = ?, approved_by = ?, approved_at = ?, rejection_reason = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(approver)
    .bind(now)
    .bind(rejection_reason)
    .bind(now)
    .bind(menu_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete_series(pool: &SqlitePool, annual_key: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM menus WHERE annual_key = ?")
        .bind(annual_key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_single(pool: &SqlitePool, menu_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM menus WHERE id = ?")
        .bind(menu_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
