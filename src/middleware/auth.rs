use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::queries::user::get_user;
use crate::routes::AppState;
use crate::types::Role;

/// Explicit caller identity attached to every authenticated request.
///
/// Resolvers and state-machine calls take this value as an argument; there
/// is no ambient per-request global.
#[derive(Clone, Debug)]
pub struct Caller {
    pub id: String,
    pub role: Role,
    pub school_id: Option<String>,
}

/// Caller-resolution middleware.
///
/// Expects `Authorization: Bearer <user-id>` where the opaque token is an
/// identity issued by the (out-of-scope) authentication service, verifies
/// the user exists and inserts a `Caller` extension carrying role and
/// school affiliation.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let token = match token {
        Some(token) => token.to_string(),
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            return AppError::Authentication(
                "Missing or malformed Authorization header".to_string(),
            )
            .into_response();
        }
    };

    match get_user(&state.pool, &token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(Caller {
                id: user.id,
                role: user.role,
                school_id: user.school_id,
            });
            next.run(req).await
        }
        Ok(None) => {
            tracing::warn!("Unknown caller identity");
            AppError::Authentication("Unknown caller identity".to_string()).into_response()
        }
        Err(e) => AppError::Database(e).into_response(),
    }
}
