pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions and portfolios
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/portfolio",
            post(handlers::handle_upload_portfolio),
        )
        .route(
            "/api/v1/sessions/:id/portfolio/default",
            post(handlers::handle_load_default),
        )
        .route(
            "/api/v1/sessions/:id/links",
            post(handlers::handle_query_links),
        )
        // Generation
        .route(
            "/api/v1/sessions/:id/emails",
            post(handlers::handle_generate_emails),
        )
        .route("/api/v1/jobs/extract", post(handlers::handle_extract_jobs))
        .with_state(state)
}
