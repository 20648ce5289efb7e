//! Shared JSON response envelope.
//!
//! Every route answers with `{ success, message?, data?, errors? }` so
//! clients never have to branch on payload shape per endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        })
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        })
    }
}

impl ApiResponse<()> {
    /// Success without a payload, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        })
    }

    pub fn failure(message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}
