//! Thin JSON surface over the feed, leaderboard and engagement services.

mod error;
mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use middleware::{PRINCIPAL_HEADER, RequestContext};
pub use state::HttpState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/v1/feed", get(handlers::feed))
        .route("/api/v1/feed/index", get(handlers::feed_index))
        .route("/api/v1/leaderboard", get(handlers::leaderboard))
        .route(
            "/api/v1/articles/{id}/interactions",
            post(handlers::record_interaction),
        )
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::resolve_principal))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
