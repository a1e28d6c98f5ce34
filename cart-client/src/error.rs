//! Client error types

use shared::ErrorCode;
use thiserror::Error;

use crate::storage::StorageError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured error returned by the cart API
    #[error("API error ({code}): {message}")]
    Api { code: ErrorCode, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// The cart API error code, if the server sent one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the failure means "this catalog entry does not exist"
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound(_) => true,
            ClientError::Api { code, .. } => matches!(
                code,
                ErrorCode::NotFound
                    | ErrorCode::ProductNotFound
                    | ErrorCode::ServiceNotFound
                    | ErrorCode::CartItemNotFound
            ),
            _ => false,
        }
    }

    /// Message suitable for a toast notification
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Http(_) => ErrorCode::NetworkError.message().to_string(),
            ClientError::Unauthorized => ErrorCode::NotAuthenticated.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
