pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Outreach pipeline
        .route("/api/v1/emails", post(handlers::handle_generate_emails))
        .route("/api/v1/emails/stream", post(handlers::handle_stream_emails))
        // Single-stage previews
        .route("/api/v1/extract", post(handlers::handle_extract))
        .route(
            "/api/v1/portfolio/links",
            get(handlers::handle_portfolio_links),
        )
        .with_state(state)
}
