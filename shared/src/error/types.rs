//! Error body returned by the cart API

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a non-2xx cart API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorBody {
    /// Create an error body with the default message for the code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            details: None,
        }
    }

    /// Create an error body with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            details: None,
        }
    }

    /// Typed error code, `Unknown` for codes this build does not know
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::try_from(self.code).unwrap_or(ErrorCode::Unknown)
    }
}
