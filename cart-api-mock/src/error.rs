//! Error responses of the mock cart API

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use shared::{ApiErrorBody, ErrorCode};
use tracing::error;

/// A failed request: the HTTP status comes from the error code
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        if status.is_server_error() {
            error!(code = %self.code, message = %self.message, "Mock API error");
        }
        let body = Json(ApiErrorBody::with_message(self.code, self.message));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
