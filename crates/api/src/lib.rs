pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

use axum::Json;
use lawguide_common::ApiResponse;
use lawguide_core::AppContext;
use std::sync::Arc;

pub use error::{ApiError, ApiResult};
pub use server::ApiServer;

// Re-export common types
pub use lawguide_common;
pub use lawguide_core;

/// Shared, read-only state handed to every handler.
pub type AppState = Arc<AppContext>;

pub fn create_success_response<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}
