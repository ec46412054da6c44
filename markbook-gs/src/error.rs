//! API error types for markbook-gs

use crate::models::IntakeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Document failed intake validation (400)
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] IntakeError),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Grading attempt not found (404)
    #[error("Grading attempt not found: {0}")]
    AttemptNotFound(Uuid),

    /// Answer key not found (404)
    #[error("Answer key not found: {0}")]
    KeyNotFound(Uuid),

    /// Extraction batch not found (404)
    #[error("Extraction batch not found: {0}")]
    BatchNotFound(Uuid),

    /// Attempt already reached a terminal state (409)
    #[error("Attempt already finished: {0}")]
    AlreadyFinished(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// markbook-common error
    #[error("Common error: {0}")]
    Common(#[from] markbook_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidDocument(ref err) => (
                StatusCode::BAD_REQUEST,
                "INVALID_DOCUMENT",
                err.to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::AttemptNotFound(id) => (
                StatusCode::NOT_FOUND,
                "ATTEMPT_NOT_FOUND",
                id.to_string(),
            ),
            ApiError::KeyNotFound(id) => {
                (StatusCode::NOT_FOUND, "KEY_NOT_FOUND", id.to_string())
            }
            ApiError::BatchNotFound(id) => {
                (StatusCode::NOT_FOUND, "BATCH_NOT_FOUND", id.to_string())
            }
            ApiError::AlreadyFinished(msg) => {
                (StatusCode::CONFLICT, "ALREADY_FINISHED", msg)
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

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
