//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use course_core::{ErrorKind, ServiceError};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    /// The course does not exist. Rendered with an empty body.
    NotFound,

    /// The request could not be understood.
    BadRequest(String),

    /// Anything else.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => AppError::NotFound,
            ErrorKind::StoreFailure | ErrorKind::CacheFailure => {
                AppError::Internal(err.message().to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound => return StatusCode::NOT_FOUND.into_response(),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
