//! Annual recurring-menu generation.
//!
//! One creation call materializes an approved menu for every same-weekday
//! date through the end of the start date's calendar year, all sharing a
//! freshly generated series key. The per-day write is an upsert on
//! (school, meal type, day), so re-running the same call overwrites content
//! instead of duplicating documents.

use chrono::{DateTime, Datelike, Duration, NaiveDate};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::menu::{menu_for_day, upsert_day, MenuDayUpsert, MenuRow};
use crate::queries::notification::{record_best_effort, NewNotification};
use crate::queries::school::get_school;
use crate::types::{MealType, NotificationKind};

/// Parse a caller-supplied date. Plain dates and RFC 3339 timestamps are
/// both accepted; time-of-day is dropped so the caller's intended calendar
/// day wins over server time zone drift.
pub fn parse_menu_date(raw: &str) -> Result<NaiveDate, AppError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.date_naive());
    }
    Err(AppError::validation(format!(
        "Invalid date '{raw}', expected YYYY-MM-DD"
    )))
}

/// `start` and every +7-day step through 31 December of `start`'s year.
/// Never wraps into the following year.
pub fn weekly_dates_through_year_end(start: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current.year() == start.year() {
        dates.push(current);
        current += Duration::days(7);
    }
    dates
}

pub fn new_series_key() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug)]
pub struct AnnualMenuContent<'a> {
    pub description: &'a str,
    pub items: &'a [String],
    pub allergens: &'a [String],
}

/// Materialize a year of weekly menus and return the representative
/// document at the start date.
pub async fn create_annual_menu(
    pool: &SqlitePool,
    caller: &Caller,
    school_id: &str,
    start_date: NaiveDate,
    meal_type: MealType,
    content: AnnualMenuContent<'_>,
) -> Result<MenuRow, AppError> {
    let school = get_school(pool, school_id)
        .await?
        .ok_or_else(|| AppError::not_found("School"))?;

    let series_key = new_series_key();
    let dates = weekly_dates_through_year_end(start_date);

    tracing::info!(
        school_id,
        meal_type = %meal_type,
        series_key = %series_key,
        occurrences = dates.len(),
        "Generating annual menu series"
    );

    // Each day is an independent upsert. A failure partway through leaves
    // earlier days written; there is no rollback.
    for date in &dates {
        upsert_day(
            pool,
            &MenuDayUpsert {
                school_id,
                menu_date: *date,
                meal_type,
                description: content.description,
                items: content.items,
                allergens: content.allergens,
                created_by: &caller.id,
                annual_key: &series_key,
            },
        )
        .await?;
    }

    let first = menu_for_day(pool, school_id, meal_type, start_date)
        .await?
        .ok_or_else(|| {
            AppError::Internal("annual menu series is missing its representative day".to_string())
        })?;

    if let Some(admin_id) = &school.admin_id {
        record_best_effort(
            pool,
            &NewNotification {
                user_id: admin_id,
                kind: NotificationKind::MenuPublished,
                title: "Annual menu published",
                message: &format!(
                    "A weekly {} menu was published for {} starting {}",
                    meal_type, school.name, start_date
                ),
                student_id: None,
                menu_id: Some(&first.id),
            },
        )
        .await;
    }

    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn covers_every_monday_through_year_end() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(); // a Monday
        let dates = weekly_dates_through_year_end(start);

        assert_eq!(dates.len(), 52);
        assert_eq!(dates[0], start);
        assert_eq!(*dates.last().unwrap(), NaiveDate::from_ymd_opt(2026, 12, 28).unwrap());
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Mon));
        assert!(dates.iter().all(|d| d.year() == 2026));
    }

    #[test]
    fn never_wraps_into_the_next_year() {
        let start = NaiveDate::from_ymd_opt(2026, 12, 26).unwrap();
        let dates = weekly_dates_through_year_end(start);
        assert_eq!(dates, vec![start]);

        let new_years_eve = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(weekly_dates_through_year_end(new_years_eve), vec![new_years_eve]);
    }

    #[test]
    fn consecutive_dates_are_seven_days_apart() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let dates = weekly_dates_through_year_end(start);
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(7));
        }
    }

    #[test]
    fn parse_accepts_plain_dates_and_timestamps() {
        assert_eq!(
            parse_menu_date("2026-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
        // Time-of-day is stripped
        assert_eq!(
            parse_menu_date("2026-01-05T23:30:00+02:00").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
        assert!(parse_menu_date("05/01/2026").is_err());
    }
}
