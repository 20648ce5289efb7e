//! Subscription routes. Status mostly moves through the billing sync on
//! payment changes; the direct status endpoint is an admin escape hatch.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::access::resolve_school_scope;
use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::student::get_student;
use crate::queries::subscription::{self, NewSubscription, SubscriptionRow};
use crate::recurrence::parse_menu_date;
use crate::response::ApiResponse;
use crate::routes::AppState;
use crate::types::{Role, SubscriptionStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionPayload {
    #[validate(length(min = 1, message = "student_id is required"))]
    #[serde(default)]
    pub student_id: String,
    #[validate(length(min = 1, message = "plan is required"))]
    #[serde(default)]
    pub plan: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    #[serde(default)]
    pub price: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<SubscriptionStatus>,
}

/// POST /subscriptions — admin or school admin enrolls a student. New
/// subscriptions default to PENDING_PAYMENT until a payment activates them.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id))]
pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionRow>>), AppError> {
    if !matches!(caller.role, Role::Admin | Role::SchoolAdmin) {
        return Err(AppError::Authorization(
            "Only administrators can create subscriptions".to_string(),
        ));
    }
    payload.validate()?;

    let start_date = payload
        .start_date
        .as_deref()
        .ok_or_else(|| AppError::validation("start_date is required"))
        .and_then(parse_menu_date)?;
    let end_date = payload
        .end_date
        .as_deref()
        .ok_or_else(|| AppError::validation("end_date is required"))
        .and_then(parse_menu_date)?;
    if end_date < start_date {
        return Err(AppError::validation("end_date must not precede start_date"));
    }

    let student = get_student(&state.pool, &payload.student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))?;

    if caller.role == Role::SchoolAdmin {
        let scope = resolve_school_scope(&state.pool, &caller).await?;
        scope.ensure(&student.school_id)?;
    }

    let id = subscription::insert_subscription(
        &state.pool,
        &NewSubscription {
            student_id: &student.id,
            plan: &payload.plan,
            price: payload.price,
            start_date,
            end_date,
            status: payload.status.unwrap_or(SubscriptionStatus::PendingPayment),
        },
    )
    .await?;

    let created = subscription::get_subscription(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    tracing::info!(subscription_id = %id, student_id = %student.id, "Subscription created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message("Subscription created", created),
    ))
}

/// GET /subscriptions/{id} — admins see everything, parents their own
/// children's subscriptions, school staff those of students in their scope.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, subscription_id = %subscription_id))]
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(subscription_id): Path<String>,
) -> Result<Json<ApiResponse<SubscriptionRow>>, AppError> {
    let found = subscription::get_subscription(&state.pool, &subscription_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    match caller.role {
        Role::Admin => {}
        Role::Parent => {
            let student = get_student(&state.pool, &found.student_id)
                .await?
                .ok_or_else(|| AppError::not_found("Student"))?;
            if student.parent_id.as_deref() != Some(caller.id.as_str()) {
                return Err(AppError::Authorization(
                    "You can only view your own children's subscriptions".to_string(),
                ));
            }
        }
        Role::SchoolAdmin | Role::CanteenStaff => {
            let student = get_student(&state.pool, &found.student_id)
                .await?
                .ok_or_else(|| AppError::not_found("Student"))?;
            let scope = resolve_school_scope(&state.pool, &caller).await?;
            scope.ensure(&student.school_id)?;
        }
    }

    Ok(ApiResponse::ok(found))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: Option<SubscriptionStatus>,
}

/// PUT /subscriptions/{id}/status — platform admin only, direct overwrite.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id, subscription_id = %subscription_id))]
pub async fn update_subscription_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(subscription_id): Path<String>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<ApiResponse<SubscriptionRow>>, AppError> {
    if caller.role != Role::Admin {
        return Err(AppError::Authorization(
            "Only platform admins can change subscription status".to_string(),
        ));
    }
    let status = payload
        .status
        .ok_or_else(|| AppError::validation("status is required"))?;

    let affected = subscription::set_subscription_status(&state.pool, &subscription_id, status).await?;
    if affected == 0 {
        return Err(AppError::not_found("Subscription"));
    }

    let updated = subscription::get_subscription(&state.pool, &subscription_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    Ok(ApiResponse::ok_with_message("Subscription status updated", updated))
}

/// DELETE /subscriptions/{id} — platform admin only. Refuses to delete a
/// subscription with recorded payments; payment history must stay attached.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, subscription_id = %subscription_id))]
pub async fn delete_subscription(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(subscription_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if caller.role != Role::Admin {
        return Err(AppError::Authorization(
            "Only platform admins can delete subscriptions".to_string(),
        ));
    }

    subscription::get_subscription(&state.pool, &subscription_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    if subscription::subscription_has_payments(&state.pool, &subscription_id).await? {
        return Err(AppError::State(
            "Subscription has recorded payments and cannot be deleted".to_string(),
        ));
    }

    subscription::delete_subscription(&state.pool, &subscription_id).await?;
    Ok(ApiResponse::message("Subscription deleted"))
}
