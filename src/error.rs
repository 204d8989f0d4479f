use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error taxonomy for the REST surface. Every variant renders as a JSON
/// body of the shape `{"error": "..."}`; 5xx details are logged, never
/// leaked to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("AI service unavailable")]
    AiUnavailable,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::AiUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Database(err) => {
                log::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                log::error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
