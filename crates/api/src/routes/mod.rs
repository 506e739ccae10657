pub mod answer;
pub mod health;

use crate::AppState;
use axum::Router;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(health::routes(state.clone()))
        .nest("/api/v1", answer::routes(state))
}

// Fallback handler for unmatched routes
pub async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}
