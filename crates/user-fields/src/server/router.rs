//! Axum router construction.

use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", get(handlers::grid))
        .route("/users/:user_id/profile", get(handlers::profile))
        .route(
            "/users/:user_id/fields/:field",
            get(handlers::read_field).put(handlers::write_field),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
