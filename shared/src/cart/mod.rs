//! Cart domain types
//!
//! - [`item`]: lines, natural keys and line inputs
//! - [`coupon`]: coupon eligibility rules
//! - [`money`]: the totals calculator
//! - [`delivery`]: shipping addresses, options and delivery zones
//! - [`catalog`]: availability and validation results

pub mod catalog;
pub mod coupon;
pub mod delivery;
pub mod item;
pub mod money;

pub use catalog::{AvailabilityIssue, CartIssue, CartValidation, CatalogEntry, IssueKind};
pub use coupon::{
    Coupon, CouponEffect, CouponRejection, CouponType, evaluate_coupon, normalize_code,
};
pub use delivery::{
    DeliveryCheck, DeliveryZone, DeliveryZones, ShippingAddress, ShippingOption,
    UndeliverableReason,
};
pub use item::{
    CartItem, CartLine, Customizations, GuestCartItem, ItemChanges, ItemRef, NewCartLine,
    merge_customizations, merge_notes,
};
pub use money::{PricingConfig, Totals, compute_totals, round_money};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a cart belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CartOwner {
    #[serde(rename_all = "camelCase")]
    Guest { session_id: String },
    #[serde(rename_all = "camelCase")]
    Account { user_id: String },
}

/// A server-side cart snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub owner: CartOwner,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Applied coupons, unique by normalized code
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub totals: Totals,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(id: impl Into<String>, owner: CartOwner, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner,
            items: Vec::new(),
            coupons: Vec::new(),
            shipping_address: None,
            totals: Totals::default(),
            updated_at: at,
        }
    }

    pub fn find_item(&self, item_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn find_by_ref(&self, item_ref: &ItemRef) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.item_ref == item_ref)
    }

    /// Lines that count towards the order
    pub fn active_items(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| !i.saved_for_later)
    }

    /// Σ quantity over active lines
    pub fn items_count(&self) -> u32 {
        self.active_items().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a coupon with this code is already applied
    pub fn has_coupon(&self, code: &str) -> bool {
        let code = normalize_code(code);
        self.coupons.iter().any(|c| c.normalized_code() == code)
    }

    /// Apply a coupon with set semantics. Returns false if already present.
    pub fn add_coupon(&mut self, coupon: Coupon) -> bool {
        if self.has_coupon(&coupon.code) {
            return false;
        }
        self.coupons.push(coupon);
        true
    }

    pub fn remove_coupon(&mut self, code: &str) -> bool {
        let code = normalize_code(code);
        let before = self.coupons.len();
        self.coupons.retain(|c| c.normalized_code() != code);
        self.coupons.len() != before
    }

    /// Recompute totals from scratch
    pub fn recalculate(&mut self, config: &PricingConfig, now: DateTime<Utc>) {
        self.totals = compute_totals(&self.items, &self.coupons, config, now);
    }
}

/// Result of `POST api/cart/coupons`. A rejection is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponApplication {
    /// Cart after the attempt (unchanged when rejected)
    pub cart: Cart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<CouponRejection>,
}

impl CouponApplication {
    pub fn applied(cart: Cart) -> Self {
        Self {
            cart,
            rejection: None,
        }
    }

    pub fn rejected(cart: Cart, rejection: CouponRejection) -> Self {
        Self {
            cart,
            rejection: Some(rejection),
        }
    }
}
