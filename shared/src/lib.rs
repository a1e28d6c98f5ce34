//! Shared types for the storefront cart
//!
//! Pure domain code used by the cart client and the mock cart API:
//! cart models, the totals calculator, coupon rules, delivery zones,
//! the cart reducer, error codes and the API response envelope.
//! Nothing in this crate performs I/O.

pub mod cart;
pub mod error;
pub mod reducer;
pub mod response;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use cart::{
    Cart, CartItem, CatalogEntry, Coupon, CouponApplication, CouponType, GuestCartItem, ItemChanges,
    ItemRef, NewCartLine, PricingConfig, Totals,
};
pub use error::{ApiErrorBody, ErrorCode};
pub use reducer::{CartAction, CartState, CartTarget, MigrationStatus, reduce};
pub use response::ApiResponse;
