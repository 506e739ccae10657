use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lawguide_common::LawGuideError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Service(#[from] LawGuideError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(err) => match err {
                LawGuideError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                LawGuideError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
                LawGuideError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Service(err) => match err {
                LawGuideError::InvalidInput(_) => "INVALID_INPUT",
                LawGuideError::GenerationUnavailable(_) => "GENERATION_UNAVAILABLE",
                LawGuideError::ModelUnavailable(_) => "EMBEDDING_UNAVAILABLE",
                _ => "INTERNAL_ERROR",
            },
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn component(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "input",
            ApiError::Service(err) => err.component(),
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!("Request failed in {}: {}", self.component(), self);
            match &self {
                // Backend failures name the dependency; internal details stay in the log.
                ApiError::Service(LawGuideError::GenerationUnavailable(_))
                | ApiError::Service(LawGuideError::ModelUnavailable(_)) => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            warn!("Rejected request: {}", self);
            self.to_string()
        };

        let body = json!({
            "success": false,
            "error": message,
            "error_code": self.code(),
            "component": self.component(),
            "timestamp": chrono::Utc::now()
        });

        (status, Json(body)).into_response()
    }
}

pub fn validation_error(message: &str) -> ApiError {
    ApiError::Validation(message.to_string())
}

pub type ApiResult<T> = Result<T, ApiError>;
