use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use chess_coach_core::engine::EngineError;
use chess_coach_core::Error as CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Core(e) => match e {
                CoreError::Position(_) | CoreError::Pgn(_) | CoreError::InsufficientBatch { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                CoreError::Engine(EngineError::NotInitialized) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Chess engine is not running".to_string())
                }
                CoreError::Engine(inner) => {
                    tracing::error!("Engine error: {inner}");
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("Analysis failed: {inner}"))
                }
                CoreError::Coach(_) | CoreError::Http(_) => {
                    tracing::error!("Coach error: {e}");
                    (StatusCode::BAD_GATEWAY, "Coach request failed".to_string())
                }
                other => {
                    tracing::error!("Unexpected error: {other}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
