//! Menu routes: listing, annual creation, series-aware update/delete and
//! the PENDING → APPROVED/REJECTED approval transition.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use validator::Validate;

use crate::access::{ensure_can_write_menu, resolve_school_scope, SchoolScope};
use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::menu::{self, MenuContentUpdate, MenuDetailRow, MenuListFilter, MenuRow};
use crate::queries::notification::{record_best_effort, NewNotification};
use crate::recurrence::{
    create_annual_menu, parse_menu_date, weekly_dates_through_year_end, AnnualMenuContent,
};
use crate::response::ApiResponse;
use crate::routes::AppState;
use crate::types::{MealType, MenuStatus, NotificationKind, Role};

#[derive(Debug, Deserialize)]
pub struct TodayQuery {
    pub school_id: Option<String>,
}

/// GET /menus/today?school_id= — today's menus for one school. Parents only
/// see approved entries.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn todays_menus(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<ApiResponse<Vec<MenuRow>>>, AppError> {
    let school_id = query
        .school_id
        .ok_or_else(|| AppError::validation("school_id is required"))?;

    let scope = resolve_school_scope(&state.pool, &caller).await?;
    scope.ensure(&school_id)?;

    let status = matches!(caller.role, Role::Parent).then_some(MenuStatus::Approved);
    let menus = menu::list_menus(
        &state.pool,
        &MenuListFilter {
            school_ids: Some(vec![school_id]),
            date: Some(Utc::now().date_naive()),
            status,
        },
    )
    .await?;

    Ok(ApiResponse::ok(menus))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub school_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// GET /menus?school_id=&date=&status= — school-scoped listing.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn list_menus(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<MenuRow>>>, AppError> {
    let scope = resolve_school_scope(&state.pool, &caller).await?;

    let school_ids = match query.school_id {
        Some(school_id) => {
            scope.ensure(&school_id)?;
            Some(vec![school_id])
        }
        None => match scope {
            SchoolScope::Unrestricted => None,
            SchoolScope::Schools(ids) => Some(ids),
        },
    };

    let date = query.date.as_deref().map(parse_menu_date).transpose()?;
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            MenuStatus::from_str(raw)
                .map_err(|_| AppError::validation(format!("Invalid status '{raw}'")))
        })
        .transpose()?;

    let menus = menu::list_menus(
        &state.pool,
        &MenuListFilter {
            school_ids,
            date,
            status,
        },
    )
    .await?;

    Ok(ApiResponse::ok(menus))
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub start_date: Option<String>,
}

/// GET /menus/week/{school_id}?start_date= — approved menus for the 7-day
/// window starting at the given date (default today).
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id))]
pub async fn week_menus(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(school_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<ApiResponse<Vec<MenuRow>>>, AppError> {
    let scope = resolve_school_scope(&state.pool, &caller).await?;
    scope.ensure(&school_id)?;

    let start = match query.start_date.as_deref() {
        Some(raw) => parse_menu_date(raw)?,
        None => Utc::now().date_naive(),
    };

    let menus = menu::approved_week(&state.pool, &school_id, start).await?;
    Ok(ApiResponse::ok(menus))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMenuPayload {
    #[validate(length(min = 1, message = "school_id is required"))]
    #[serde(default)]
    pub school_id: String,
    #[validate(length(min = 1, message = "date is required"))]
    #[serde(default)]
    pub date: String,
    pub meal_type: Option<MealType>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// POST /menus — canteen staff only. One call materializes the whole annual
/// series through the recurrence engine.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id))]
pub async fn create_menu(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateMenuPayload>,
) -> Result<(StatusCode, Json<ApiResponse<MenuDetailRow>>), AppError> {
    if caller.role != Role::CanteenStaff {
        return Err(AppError::Authorization(
            "Only canteen staff can create menus".to_string(),
        ));
    }
    payload.validate()?;
    let meal_type = payload
        .meal_type
        .ok_or_else(|| AppError::validation("meal_type is required"))?;
    let start_date = parse_menu_date(&payload.date)?;

    let scope = resolve_school_scope(&state.pool, &caller).await?;
    scope.ensure(&payload.school_id)?;

    let first = create_annual_menu(
        &state.pool,
        &caller,
        &payload.school_id,
        start_date,
        meal_type,
        AnnualMenuContent {
            description: &payload.description,
            items: &payload.items,
            allergens: &payload.allergens,
        },
    )
    .await?;

    let detail = menu::menu_with_display(&state.pool, &first.id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;

    let occurrences = weekly_dates_through_year_end(start_date).len();
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(
            format!("Annual menu created with {occurrences} weekly entries"),
            detail,
        ),
    ))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateMenuPayload {
    pub date: Option<String>,
    pub description: Option<String>,
    pub items: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
}

/// PUT /menus/{id} — write-gated. Series records fan the update out to
/// every document sharing the annual key and force the series back to
/// APPROVED; ad hoc records update individually.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id, menu_id = %menu_id))]
pub async fn update_menu(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(menu_id): Path<String>,
    Json(payload): Json<UpdateMenuPayload>,
) -> Result<Json<ApiResponse<MenuRow>>, AppError> {
    let existing = menu::get_menu(&state.pool, &menu_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;
    ensure_can_write_menu(&state.pool, &existing, &caller).await?;

    let update = MenuContentUpdate {
        description: payload.description.as_deref(),
        items: payload.items.as_deref(),
        allergens: payload.allergens.as_deref(),
    };

    let message = if let Some(annual_key) = &existing.annual_key {
        // Changing one day's date inside a year-long series is not
        // supported; a date in the payload is ignored here.
        if payload.date.is_some() {
            tracing::debug!(menu_id = %menu_id, "Ignoring date field for series update");
        }
        let affected = menu::update_series(&state.pool, annual_key, &update, &caller.id).await?;

        if existing.created_by != caller.id {
            record_best_effort(
                &state.pool,
                &NewNotification {
                    user_id: &existing.created_by,
                    kind: NotificationKind::MenuUpdated,
                    title: "Menu series updated",
                    message: &format!(
                        "The weekly {} menu series starting {} was updated",
                        existing.meal_type, existing.menu_date
                    ),
                    student_id: None,
                    menu_id: Some(&existing.id),
                },
            )
            .await;
        }

        format!("Menu series updated ({affected} entries)")
    } else {
        let menu_date = payload.date.as_deref().map(parse_menu_date).transpose()?;
        menu::update_single(&state.pool, &menu_id, &update, menu_date)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::State(
                    "A menu already exists for this school, meal type and date".to_string(),
                ),
                _ => AppError::Database(e),
            })?;
        "Menu updated".to_string()
    };

    let updated = menu::get_menu(&state.pool, &menu_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;

    Ok(ApiResponse::ok_with_message(message, updated))
}

/// DELETE /menus/{id} — series deletion removes every document sharing the
/// annual key; ad hoc deletion removes the single document.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, menu_id = %menu_id))]
pub async fn delete_menu(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(menu_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let existing = menu::get_menu(&state.pool, &menu_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;
    ensure_can_write_menu(&state.pool, &existing, &caller).await?;

    let message = if let Some(annual_key) = &existing.annual_key {
        let affected = menu::delete_series(&state.pool, annual_key).await?;

        if existing.created_by != caller.id {
            record_best_effort(
                &state.pool,
                &NewNotification {
                    user_id: &existing.created_by,
                    kind: NotificationKind::MenuDeleted,
                    title: "Menu series deleted",
                    message: &format!(
                        "The weekly {} menu series starting {} was deleted",
                        existing.meal_type, existing.menu_date
                    ),
                    student_id: None,
                    menu_id: None,
                },
            )
            .await;
        }

        format!("Menu series deleted ({affected} entries)")
    } else {
        menu::delete_single(&state.pool, &menu_id).await?;
        "Menu deleted".to_string()
    };

    Ok(ApiResponse::message(message))
}

#[derive(Debug, Deserialize)]
pub struct ApprovePayload {
    pub approved: Option<bool>,
    pub rejection_reason: Option<String>,
}

/// POST /menus/{id}/approve — the PENDING → APPROVED/REJECTED transition.
/// Both outcomes are terminal for this call; only series/ad hoc updates can
/// change the status afterwards.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id, menu_id = %menu_id))]
pub async fn approve_menu(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(menu_id): Path<String>,
    Json(payload): Json<ApprovePayload>,
) -> Result<Json<ApiResponse<MenuRow>>, AppError> {
    let approved = payload
        .approved
        .ok_or_else(|| AppError::validation("approved decision is required"))?;

    let existing = menu::get_menu(&state.pool, &menu_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;
    ensure_can_write_menu(&state.pool, &existing, &caller).await?;

    if existing.status != MenuStatus::Pending {
        return Err(AppError::State(format!(
            "Menu is not pending (current status: {})",
            existing.status
        )));
    }

    let reason = payload
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if !approved && reason.is_none() {
        return Err(AppError::validation(
            "rejection_reason is required when rejecting",
        ));
    }

    let (status, kind, title, message) = if approved {
        (
            MenuStatus::Approved,
            NotificationKind::MenuApproved,
            "Menu approved",
            format!(
                "Your {} menu for {} was approved",
                existing.meal_type, existing.menu_date
            ),
        )
    } else {
        (
            MenuStatus::Rejected,
            NotificationKind::MenuRejected,
            "Menu rejected",
            format!(
                "Your {} menu for {} was rejected: {}",
                existing.meal_type,
                existing.menu_date,
                reason.unwrap_or_default()
            ),
        )
    };

    menu::record_decision(
        &state.pool,
        &menu_id,
        status,
        &caller.id,
        if approved { None } else { reason },
    )
    .await?;

    if existing.created_by != caller.id {
        record_best_effort(
            &state.pool,
            &NewNotification {
                user_id: &existing.created_by,
                kind,
                title,
                message: &message,
                student_id: None,
                menu_id: Some(&existing.id),
            },
        )
        .await;
    }

    let updated = menu::get_menu(&state.pool, &menu_id)
        .await?
        .ok_or_else(|| AppError::not_found("Menu"))?;

    Ok(ApiResponse::ok_with_message(title, updated))
}
