// API module - HTTP endpoints

pub mod admins;
pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod class_schedules;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod payment_plans;
pub mod recruitment;
pub mod response;
pub mod templates;
pub mod todos;
pub mod venues;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::PostgresStore;

use middleware::auth::require_auth;
use middleware::session::AppState;

/// Full application: public routes, the login-gated API and the shared layers
pub fn app(state: AppState, session_layer: SessionManagerLayer<PostgresStore>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router())
        .merge(protected_router().route_layer(axum::middleware::from_fn(require_auth)))
        .layer(session_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every endpoint that needs a logged-in admin
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .merge(admins::router())
        .merge(venues::router())
        .merge(class_schedules::router())
        .merge(payment_plans::router())
        .merge(bookings::router())
        .merge(recruitment::router())
        .merge(todos::router())
        .merge(templates::router())
        .merge(notifications::router())
        .merge(analytics::router())
}
