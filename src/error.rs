use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Error taxonomy shared by every route.
///
/// All variants convert into the response envelope at the request boundary;
/// nothing below the handler layer builds HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    /// Action invalid for the entity's current status, e.g. approving a
    /// menu that is no longer pending.
    #[error("{0}")]
    State(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{entity} not found"))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Validation(errors) => {
                let message = errors.join(", ");
                (StatusCode::BAD_REQUEST, message, Some(errors))
            }
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::State(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred. Please try again later.".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred. Please try again later.".to_string(),
                    None,
                )
            }
        };

        (status, Json(ApiResponse::failure(message, errors))).into_response()
    }
}
