use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recognition
        .route("/api/asr/recognize", post(handlers::recognize))
        .layer(middleware)
        .with_state(state)
}
