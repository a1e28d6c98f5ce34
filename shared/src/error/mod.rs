//! Error codes and the wire error body
//!
//! - [`ErrorCode`]: numeric codes shared by the cart API and the client
//! - [`ApiErrorBody`]: the `{code, message, details?}` body of a failed request

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::ApiErrorBody;
