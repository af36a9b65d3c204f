pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::cma::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // CMA API
        .route("/api/v1/cma", post(handlers::handle_submit_cma))
        .route("/api/v1/cma", get(handlers::handle_list_cma))
        .route("/api/v1/cma/:id", get(handlers::handle_get_cma))
        .route(
            "/api/v1/cma/:id/report",
            get(handlers::handle_cma_report),
        )
        .with_state(state)
}
