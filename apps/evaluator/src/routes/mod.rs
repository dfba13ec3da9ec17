pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use axum::http::Uri;

use crate::errors::AppError;
use crate::evaluation::handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/questions", get(handlers::handle_list_questions))
        .route("/api/v1/evaluate", post(handlers::handle_evaluate))
        .route(
            "/api/v1/evaluate/batch",
            post(handlers::handle_evaluate_batch),
        )
        .fallback(not_found)
        .with_state(state)
}
