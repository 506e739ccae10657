use crate::{create_success_response, AppState};
use axum::{extract::State, routing::get, Json, Router};
use lawguide_common::ApiResponse;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub index: IndexHealth,
}

#[derive(Debug, Serialize)]
pub struct IndexHealth {
    pub passages: usize,
    pub dimension: usize,
    pub embedding_model: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthCheck>> {
    debug!("Health check requested");

    let index = state.index();
    create_success_response(HealthCheck {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index: IndexHealth {
            passages: index.len(),
            dimension: index.dimension(),
            embedding_model: index.embedding_model().to_string(),
        },
    })
}

// The context only exists once the index and backends passed their startup
// checks, so serving this handler means the service is ready.
async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    debug!("Readiness check requested");

    Json(json!({
        "status": "ready",
        "timestamp": chrono::Utc::now(),
        "checks": {
            "index": if state.index().is_empty() { "empty" } else { "loaded" },
            "embedding_model": state.settings().embedding.model_id(),
            "generation_model": state.settings().generation.model
        }
    }))
}

async fn liveness_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now()
    }))
}
