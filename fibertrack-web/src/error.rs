//! HTTP error mapping
//!
//! Every failure leaves as `{"error": {"code": ..., "message": ...}}`.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fibertrack_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Bulletin number already belongs to another record (409)
    #[error("Bulletin number already in use: {0}")]
    KeyConflict(String),

    /// Upload lacks a required column (422)
    #[error("Required column missing from upload: {0}")]
    SchemaMismatch(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Anything else from the shared crates (500)
    #[error(transparent)]
    Common(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => ApiError::NotFound(what),
            Error::InvalidInput(msg) | Error::Spreadsheet(msg) => ApiError::BadRequest(msg),
            Error::KeyConflict { bulletin_number } => ApiError::KeyConflict(bulletin_number),
            Error::SchemaMismatch { column } => ApiError::SchemaMismatch(column),
            other => ApiError::Common(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) | ApiError::Multipart(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiError::KeyConflict(_) => (StatusCode::CONFLICT, "KEY_CONFLICT"),
            ApiError::SchemaMismatch(_) => (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_MISMATCH"),
            ApiError::Internal(_) | ApiError::Common(_) => {
                error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
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
