//! Router construction

use super::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api/v1/verify", post(handlers::verify_claim))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit_bytes)),
        )
        .with_state(state)
}
