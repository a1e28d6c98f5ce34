//! Unified error codes for the storefront cart
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Cart errors
//! - 5xxx: Coupon errors
//! - 6xxx: Catalog errors
//! - 7xxx: Delivery errors
//! - 9xxx: System errors

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Codes travel as plain `u16` values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    Unknown = 1,
    ValidationFailed = 2,
    NotFound = 3,
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    NotAuthenticated = 1001,
    TokenInvalid = 1004,
    SessionExpired = 1005,

    // ==================== 4xxx: Cart ====================
    CartNotFound = 4001,
    CartItemNotFound = 4002,
    CartEmpty = 4003,
    InvalidQuantity = 4004,
    ItemRefMissing = 4005,

    // ==================== 5xxx: Coupon ====================
    CouponNotFound = 5001,
    CouponInactive = 5002,
    CouponExpired = 5003,
    CouponUsageLimitReached = 5004,
    CouponMinimumNotMet = 5005,
    CouponAlreadyApplied = 5006,

    // ==================== 6xxx: Catalog ====================
    ProductNotFound = 6001,
    ServiceNotFound = 6002,
    ProductOutOfStock = 6003,
    ProductInactive = 6004,

    // ==================== 7xxx: Delivery ====================
    UndeliverableAddress = 7001,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    NetworkError = 9003,
    TimeoutError = 9004,
    StorageCorrupted = 9403,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            ErrorCode::NotAuthenticated => "Authentication required",
            ErrorCode::TokenInvalid => "Token is invalid",
            ErrorCode::SessionExpired => "Session has expired",

            ErrorCode::CartNotFound => "Cart not found",
            ErrorCode::CartItemNotFound => "Cart item not found",
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::InvalidQuantity => "Quantity must be a positive integer",
            ErrorCode::ItemRefMissing => "Either productId or serviceId is required",

            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponInactive => "Coupon is not active",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponUsageLimitReached => "Coupon usage limit reached",
            ErrorCode::CouponMinimumNotMet => "Minimum order amount not met",
            ErrorCode::CouponAlreadyApplied => "Coupon already applied",

            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ServiceNotFound => "Service not found",
            ErrorCode::ProductOutOfStock => "Insufficient stock",
            ErrorCode::ProductInactive => "Product is no longer available",

            ErrorCode::UndeliverableAddress => "We do not deliver to this address yet",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Request timed out",
            ErrorCode::StorageCorrupted => "Local storage is corrupted",
        }
    }

    /// HTTP status the cart API answers with for this code
    pub const fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::Success => StatusCode::OK,
            ErrorCode::NotAuthenticated | ErrorCode::TokenInvalid | ErrorCode::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            ErrorCode::NotFound
            | ErrorCode::CartNotFound
            | ErrorCode::CartItemNotFound
            | ErrorCode::CouponNotFound
            | ErrorCode::ProductNotFound
            | ErrorCode::ServiceNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidRequest
            | ErrorCode::CartEmpty
            | ErrorCode::InvalidQuantity
            | ErrorCode::ItemRefMissing
            | ErrorCode::CouponInactive
            | ErrorCode::CouponExpired
            | ErrorCode::CouponUsageLimitReached
            | ErrorCode::CouponMinimumNotMet
            | ErrorCode::CouponAlreadyApplied
            | ErrorCode::ProductOutOfStock
            | ErrorCode::ProductInactive
            | ErrorCode::UndeliverableAddress => StatusCode::BAD_REQUEST,
            ErrorCode::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Unknown
            | ErrorCode::InternalError
            | ErrorCode::NetworkError
            | ErrorCode::StorageCorrupted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::SessionExpired),

            4001 => Ok(ErrorCode::CartNotFound),
            4002 => Ok(ErrorCode::CartItemNotFound),
            4003 => Ok(ErrorCode::CartEmpty),
            4004 => Ok(ErrorCode::InvalidQuantity),
            4005 => Ok(ErrorCode::ItemRefMissing),

            5001 => Ok(ErrorCode::CouponNotFound),
            5002 => Ok(ErrorCode::CouponInactive),
            5003 => Ok(ErrorCode::CouponExpired),
            5004 => Ok(ErrorCode::CouponUsageLimitReached),
            5005 => Ok(ErrorCode::CouponMinimumNotMet),
            5006 => Ok(ErrorCode::CouponAlreadyApplied),

            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ServiceNotFound),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6004 => Ok(ErrorCode::ProductInactive),

            7001 => Ok(ErrorCode::UndeliverableAddress),

            9001 => Ok(ErrorCode::InternalError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9403 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
