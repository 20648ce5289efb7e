//! Payment routes. Every status change that lands on a terminal outcome is
//! immediately propagated to the owning subscription through the billing
//! sync, so subscription state never has to be derived at read time.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::access::resolve_school_scope;
use crate::billing::{
    generate_verification_code, normalize_outcome, sync_subscription_for_payment, PaymentOutcome,
};
use crate::error::AppError;
use crate::middleware::auth::Caller;
use crate::queries::payment::{self, NewPayment, PaymentRow};
use crate::queries::student::get_student;
use crate::queries::subscription::get_subscription;
use crate::response::ApiResponse;
use crate::routes::AppState;
use crate::types::{PaymentMethod, PaymentStatus, Role};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentPayload {
    #[validate(length(min = 1, message = "subscription_id is required"))]
    #[serde(default)]
    pub subscription_id: String,
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    #[serde(default)]
    pub amount: f64,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
}

/// POST /payments — parents record a payment against a subscription.
///
/// Cash settles immediately and activates the subscription. Every other
/// method parks the payment on WAITING_ADMIN_VALIDATION with a verification
/// code and holds the subscription on PENDING_PAYMENT until an admin
/// confirms.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id))]
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentRow>>), AppError> {
    if caller.role != Role::Parent {
        return Err(AppError::Authorization(
            "Only parents can record payments".to_string(),
        ));
    }
    payload.validate()?;
    let method = payload
        .method
        .ok_or_else(|| AppError::validation("method is required"))?;

    get_subscription(&state.pool, &payload.subscription_id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription"))?;

    let (status, verification_code, outcome) = match method {
        PaymentMethod::Cash => (PaymentStatus::Completed, None, PaymentOutcome::Completed),
        _ => (
            PaymentStatus::WaitingAdminValidation,
            Some(generate_verification_code()),
            PaymentOutcome::Failed,
        ),
    };

    let payment_id = payment::insert_payment(
        &state.pool,
        &NewPayment {
            subscription_id: &payload.subscription_id,
            parent_id: &caller.id,
            amount: payload.amount,
            method,
            status,
            reference: payload.reference.as_deref(),
            verification_code: verification_code.as_deref(),
        },
    )
    .await?;

    sync_subscription_for_payment(&state.pool, &payload.subscription_id, outcome).await?;

    let created = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    tracing::info!(
        payment_id = %payment_id,
        method = %method,
        status = %created.status,
        "Payment recorded"
    );

    let message = match method {
        PaymentMethod::Cash => "Payment completed".to_string(),
        _ => "Payment recorded, awaiting admin validation".to_string(),
    };
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(message, created),
    ))
}

/// Read access: admins see everything, parents their own payments, school
/// staff payments for students of schools in their scope.
async fn ensure_payment_access(
    state: &AppState,
    payment: &PaymentRow,
    caller: &Caller,
) -> Result<(), AppError> {
    match caller.role {
        Role::Admin => Ok(()),
        Role::Parent => {
            if payment.parent_id == caller.id {
                Ok(())
            } else {
                Err(AppError::Authorization(
                    "You can only view your own payments".to_string(),
                ))
            }
        }
        Role::SchoolAdmin | Role::CanteenStaff => {
            let subscription = get_subscription(&state.pool, &payment.subscription_id)
                .await?
                .ok_or_else(|| AppError::not_found("Subscription"))?;
            let student = get_student(&state.pool, &subscription.student_id)
                .await?
                .ok_or_else(|| AppError::not_found("Student"))?;
            let scope = resolve_school_scope(&state.pool, caller).await?;
            scope.ensure(&student.school_id)
        }
    }
}

/// GET /payments/{id}
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, payment_id = %payment_id))]
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(payment_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentRow>>, AppError> {
    let payment = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;
    ensure_payment_access(&state, &payment, &caller).await?;
    Ok(ApiResponse::ok(payment))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentPayload {
    pub status: Option<String>,
    pub verification_code: Option<String>,
}

/// POST /payments/{id}/verify — admin or school admin confirms a payment.
///
/// The submitted status must fold to a canonical outcome. For non-cash
/// payments a submitted verification code is checked against the stored
/// one. Only platform admins propagate the outcome to the subscription;
/// a school admin's verification touches the payment alone.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id, payment_id = %payment_id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(payment_id): Path<String>,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<Json<ApiResponse<PaymentRow>>, AppError> {
    if !matches!(caller.role, Role::Admin | Role::SchoolAdmin) {
        return Err(AppError::Authorization(
            "Only administrators can verify payments".to_string(),
        ));
    }

    let existing = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    // Refunded payments are terminal and never reopened.
    if existing.status == PaymentStatus::Refunded {
        return Err(AppError::State(format!(
            "Payment cannot be verified from status {}",
            existing.status
        )));
    }

    let raw = payload
        .status
        .as_deref()
        .ok_or_else(|| AppError::validation("status is required"))?;
    let outcome = normalize_outcome(raw)
        .ok_or_else(|| AppError::validation(format!("Unrecognized payment status '{raw}'")))?;

    if existing.method != PaymentMethod::Cash {
        if let Some(code) = payload.verification_code.as_deref() {
            if existing.verification_code.as_deref() != Some(code) {
                return Err(AppError::validation("Invalid verification code"));
            }
        }
    }

    payment::set_payment_status(&state.pool, &payment_id, outcome.payment_status()).await?;

    if caller.role == Role::Admin {
        sync_subscription_for_payment(&state.pool, &existing.subscription_id, outcome).await?;
    }

    let updated = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    Ok(ApiResponse::ok_with_message("Payment verified", updated))
}

#[derive(Debug, Deserialize)]
pub struct ValidatePaymentPayload {
    pub status: Option<String>,
}

/// POST /payments/{id}/validate — platform admin settles a held payment.
/// Always propagates the outcome to the subscription.
#[tracing::instrument(skip(state, caller, payload), fields(caller_id = %caller.id, payment_id = %payment_id))]
pub async fn validate_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(payment_id): Path<String>,
    Json(payload): Json<ValidatePaymentPayload>,
) -> Result<Json<ApiResponse<PaymentRow>>, AppError> {
    if caller.role != Role::Admin {
        return Err(AppError::Authorization(
            "Only platform admins can validate payments".to_string(),
        ));
    }

    let existing = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    if !matches!(
        existing.status,
        PaymentStatus::WaitingAdminValidation
            | PaymentStatus::Pending
            | PaymentStatus::Completed
            | PaymentStatus::Failed
    ) {
        return Err(AppError::State(format!(
            "Payment cannot be validated from status {}",
            existing.status
        )));
    }

    let raw = payload
        .status
        .as_deref()
        .ok_or_else(|| AppError::validation("status is required"))?;
    let outcome = normalize_outcome(raw)
        .ok_or_else(|| AppError::validation(format!("Unrecognized payment status '{raw}'")))?;

    payment::set_payment_status(&state.pool, &payment_id, outcome.payment_status()).await?;
    sync_subscription_for_payment(&state.pool, &existing.subscription_id, outcome).await?;

    let updated = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    Ok(ApiResponse::ok_with_message("Payment validated", updated))
}

/// POST /payments/{id}/simulate-confirmation — test-environment shortcut
/// that forces a payment to COMPLETED. Gated behind a config flag and
/// disabled by default.
#[tracing::instrument(skip(state, caller), fields(caller_id = %caller.id, payment_id = %payment_id))]
pub async fn simulate_confirmation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(payment_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentRow>>, AppError> {
    if !state.config.features.payment_simulation {
        return Err(AppError::Authorization(
            "Payment simulation is disabled in this environment".to_string(),
        ));
    }

    let existing = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    payment::set_payment_status(&state.pool, &payment_id, PaymentStatus::Completed).await?;
    sync_subscription_for_payment(
        &state.pool,
        &existing.subscription_id,
        PaymentOutcome::Completed,
    )
    .await?;

    let updated = payment::get_payment(&state.pool, &payment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    Ok(ApiResponse::ok_with_message(
        "Payment confirmation simulated",
        updated,
    ))
}
