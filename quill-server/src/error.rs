//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quill_core::QuillError;
use serde::Serialize;

pub const NO_TOKEN: &str = "Not authorized, no token provided";
pub const TOKEN_FAILED: &str = "Not authorized, token failed";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a handler can return before the response has started
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    Export(QuillError),
    Internal(String),
}

impl From<QuillError> for ApiError {
    fn from(err: QuillError) -> Self {
        ApiError::Export(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Export(QuillError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Export(QuillError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Export(QuillError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Export(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(message) => message.to_string(),
            ApiError::Export(
                QuillError::Validation(message)
                | QuillError::Forbidden(message)
                | QuillError::NotFound(message),
            ) => message.clone(),
            // Internal details stay in the logs
            ApiError::Export(_) | ApiError::Internal(_) => "Export failed".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                ApiError::Export(e) => tracing::error!(error = %e, "Export failed"),
                ApiError::Internal(e) => tracing::error!(error = %e, "Internal error"),
                ApiError::Unauthorized(_) => {}
            }
        }
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}
