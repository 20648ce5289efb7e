pub mod health;
pub mod menus;
pub mod notifications;
pub mod payments;
pub mod subscriptions;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::auth_middleware;

/// Shared handler state: the connection pool plus the resolved runtime
/// configuration (feature flags are read per request).
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}

/// Builds the full application router. Health probes stay outside the
/// caller-resolution middleware; everything else requires an identity.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(state.pool.clone());

    let protected = Router::new()
        .route("/menus", get(menus::list_menus).post(menus::create_menu))
        .route("/menus/today", get(menus::todays_menus))
        .route("/menus/week/{school_id}", get(menus::week_menus))
        .route(
            "/menus/{id}",
            put(menus::update_menu).delete(menus::delete_menu),
        )
        .route("/menus/{id}/approve", post(menus::approve_menu))
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route(
            "/subscriptions/{id}",
            get(subscriptions::get_subscription).delete(subscriptions::delete_subscription),
        )
        .route(
            "/subscriptions/{id}/status",
            put(subscriptions::update_subscription_status),
        )
        .route("/payments", post(payments::create_payment))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/verify", post(payments::verify_payment))
        .route("/payments/{id}/validate", post(payments::validate_payment))
        .route(
            "/payments/{id}/simulate-confirmation",
            post(payments::simulate_confirmation),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_notification_read),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    public.merge(protected).layer(TraceLayer::new_for_http())
}
