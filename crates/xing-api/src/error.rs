//! API error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use xing_core::CrossingError;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest { kind: &'static str, message: String },
    /// 404 Not Found
    NotFound { kind: &'static str, message: String },
    /// 409 Conflict (transition refused by the table)
    Conflict { kind: &'static str, message: String },
    /// 500 Internal Server Error
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            ApiError::BadRequest { kind, message }
            | ApiError::NotFound { kind, message }
            | ApiError::Conflict { kind, message } => (kind, message),
            ApiError::Internal(message) => ("internal_error", message),
        };

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "API error");
        } else if status.is_client_error() {
            tracing::debug!(error = error_type, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<CrossingError> for ApiError {
    fn from(err: CrossingError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            CrossingError::InvalidCrossing(_) => ApiError::NotFound { kind, message },
            CrossingError::InvalidTransition { .. } => ApiError::Conflict { kind, message },
            CrossingError::UnknownCommand(_) | CrossingError::InvalidParameter(_) => {
                ApiError::BadRequest { kind, message }
            }
            CrossingError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
