//! Error types for lms-stream handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::stream::StreamError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or malformed caller identity (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Stream(err) => match err {
                StreamError::EmptyContent => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_CONTENT"),
                StreamError::NoContent => (StatusCode::NOT_FOUND, "NO_CONTENT"),
                StreamError::ModuleNotFound(_) => (StatusCode::NOT_FOUND, "MODULE_NOT_FOUND"),
                StreamError::CourseNotFound(_) => (StatusCode::NOT_FOUND, "COURSE_NOT_FOUND"),
                StreamError::NotTextStream(_) => (StatusCode::BAD_REQUEST, "NOT_TEXT_STREAM"),
                StreamError::NoProgress => (StatusCode::BAD_REQUEST, "NO_PROGRESS"),
                StreamError::ProgressRecordNotFound => (StatusCode::NOT_FOUND, "PROGRESS_NOT_FOUND"),
                StreamError::ContentSource(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONTENT_SOURCE_ERROR")
                }
                StreamError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = match &self {
            ApiError::Stream(err) => err.to_string(),
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => msg.clone(),
        };

        if status.is_server_error() {
            error!("{}: {}", error_code, message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
