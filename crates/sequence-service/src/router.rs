//! Route table for the sequence generation API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the application router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health));

    let sequence_routes = Router::new()
        .route("/api/sequence", post(handlers::generate))
        .route("/api/digest", post(handlers::observation_digest))
        .route("/api/program/digest", post(handlers::program_digest));

    Router::new()
        .merge(health_routes)
        .merge(sequence_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
