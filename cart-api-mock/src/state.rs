//! In-memory store behind the mock cart API
//!
//! Carts are keyed by owner: account carts by user id (resolved from the
//! bearer token), guest carts by the `X-Session-Id` header. Carts are
//! created lazily on first access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::cart::{
    AvailabilityIssue, Cart, CartIssue, CartItem, CartOwner, CartValidation, CatalogEntry, Coupon,
    CouponApplication, CouponRejection, DeliveryCheck, DeliveryZones, IssueKind, ItemChanges,
    ItemRef, NewCartLine, PricingConfig, ShippingAddress, ShippingOption, merge_customizations,
    merge_notes, normalize_code,
};
use shared::ErrorCode;

use crate::error::{ApiError, ApiResult};

/// Who is calling
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Caller {
    Account(String),
    Guest(String),
}

impl Caller {
    fn owner(&self) -> CartOwner {
        match self {
            Caller::Account(user_id) => CartOwner::Account {
                user_id: user_id.clone(),
            },
            Caller::Guest(session_id) => CartOwner::Guest {
                session_id: session_id.clone(),
            },
        }
    }
}

/// Shared state of the mock server
pub struct MockState {
    pricing: PricingConfig,
    zones: DeliveryZones,
    carts: RwLock<HashMap<Caller, Cart>>,
    /// token → user id
    tokens: RwLock<HashMap<String, String>>,
    products: RwLock<HashMap<String, CatalogEntry>>,
    services: RwLock<HashMap<String, CatalogEntry>>,
    /// normalized code → coupon
    coupons: RwLock<HashMap<String, Coupon>>,
    offline: AtomicBool,
    requests: AtomicU64,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl MockState {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            pricing,
            zones: DeliveryZones::default(),
            carts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            products: RwLock::new(HashMap::new()),
            services: RwLock::new(HashMap::new()),
            coupons: RwLock::new(HashMap::new()),
            offline: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        }
    }

    // ========== Test controls ==========

    /// Register a user and return a bearer token for it
    pub fn sign_in(&self, user_id: &str) -> String {
        let token = format!("mock-{}", uuid::Uuid::new_v4().simple());
        self.tokens.write().insert(token.clone(), user_id.to_string());
        token
    }

    pub fn put_product(&self, entry: CatalogEntry) {
        self.products.write().insert(entry.id.clone(), entry);
    }

    pub fn put_service(&self, entry: CatalogEntry) {
        self.services.write().insert(entry.id.clone(), entry);
    }

    pub fn remove_product(&self, id: &str) -> Option<CatalogEntry> {
        self.products.write().remove(id)
    }

    pub fn put_coupon(&self, coupon: Coupon) {
        self.coupons.write().insert(coupon.normalized_code(), coupon);
    }

    /// While offline every request fails with 503
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub(crate) fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn account_cart(&self, user_id: &str) -> Option<Cart> {
        self.carts
            .read()
            .get(&Caller::Account(user_id.to_string()))
            .cloned()
    }

    // ========== Identity ==========

    pub fn resolve_token(&self, token: &str) -> ApiResult<String> {
        self.tokens
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| ApiError::new(ErrorCode::TokenInvalid))
    }

    // ========== Catalog ==========

    pub fn catalog_entry(&self, item_ref: &ItemRef) -> ApiResult<CatalogEntry> {
        let (table, missing) = match item_ref {
            ItemRef::Product { .. } => (&self.products, ErrorCode::ProductNotFound),
            ItemRef::Service { .. } => (&self.services, ErrorCode::ServiceNotFound),
        };
        table
            .read()
            .get(item_ref.id())
            .cloned()
            .ok_or_else(|| ApiError::with_message(missing, format!("{} not found", item_ref)))
    }

    // ========== Carts ==========

    fn new_cart(&self, caller: &Caller) -> Cart {
        let now = Utc::now();
        let mut cart = Cart::new(
            format!("cart-{}", uuid::Uuid::new_v4().simple()),
            caller.owner(),
            now,
        );
        cart.recalculate(&self.pricing, now);
        cart
    }

    /// Run `f` against the caller's cart, creating it if needed, then
    /// recompute totals.
    fn with_cart(
        &self,
        caller: &Caller,
        f: impl FnOnce(&mut Cart) -> ApiResult<()>,
    ) -> ApiResult<()> {
        let now = Utc::now();
        let mut carts = self.carts.write();
        let cart = carts
            .entry(caller.clone())
            .or_insert_with(|| self.new_cart(caller));
        f(cart)?;
        cart.updated_at = now;
        cart.recalculate(&self.pricing, now);
        Ok(())
    }

    pub fn cart(&self, caller: &Caller) -> ApiResult<Cart> {
        let mut carts = self.carts.write();
        let cart = carts
            .entry(caller.clone())
            .or_insert_with(|| self.new_cart(caller));
        Ok(cart.clone())
    }

    pub fn add_item(&self, caller: &Caller, line: NewCartLine) -> ApiResult<Cart> {
        if line.quantity == 0 {
            return Err(ApiError::new(ErrorCode::InvalidQuantity));
        }
        let entry = self.catalog_entry(&line.item_ref)?;
        let now = Utc::now();

        self.with_cart(caller, |cart| {
            let existing = cart.find_by_ref(&line.item_ref).map(|i| i.quantity).unwrap_or(0);
            check_availability(&entry, existing.saturating_add(line.quantity))?;

            if let Some(item) = cart.items.iter_mut().find(|i| i.item_ref == line.item_ref) {
                item.quantity += line.quantity;
                merge_customizations(&mut item.customizations, &line.customizations);
                merge_notes(&mut item.notes, line.notes.as_deref());
                item.saved_for_later = false;
                item.updated_at = now;
            } else {
                cart.items.push(CartItem {
                    id: format!("item-{}", uuid::Uuid::new_v4().simple()),
                    item_ref: line.item_ref.clone(),
                    name: entry.name.clone(),
                    quantity: line.quantity,
                    unit_price: entry.price.unwrap_or(Decimal::ZERO),
                    original_price: None,
                    discount: Decimal::ZERO,
                    customizations: line.customizations.clone(),
                    notes: line.notes.clone().filter(|n| !n.trim().is_empty()),
                    saved_for_later: false,
                    added_at: now,
                    updated_at: now,
                });
            }
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn update_item(
        &self,
        caller: &Caller,
        item_id: &str,
        changes: ItemChanges,
    ) -> ApiResult<Cart> {
        let item_ref = self
            .cart(caller)?
            .find_item(item_id)
            .map(|i| i.item_ref.clone())
            .ok_or_else(|| ApiError::new(ErrorCode::CartItemNotFound))?;

        if let Some(quantity) = changes.quantity.filter(|q| *q > 0) {
            let entry = self.catalog_entry(&item_ref)?;
            check_availability(&entry, quantity)?;
        }

        let now = Utc::now();
        self.with_cart(caller, |cart| {
            if changes.quantity == Some(0) {
                cart.items.retain(|i| i.id != item_id);
                return Ok(());
            }
            let item = cart
                .items
                .iter_mut()
                .find(|i| i.id == item_id)
                .ok_or_else(|| ApiError::new(ErrorCode::CartItemNotFound))?;
            if let Some(quantity) = changes.quantity {
                item.quantity = quantity;
            }
            if let Some(saved) = changes.saved_for_later {
                item.saved_for_later = saved;
            }
            if let Some(notes) = &changes.notes {
                item.notes = Some(notes.clone()).filter(|n| !n.trim().is_empty());
            }
            if let Some(customizations) = &changes.customizations {
                merge_customizations(&mut item.customizations, customizations);
            }
            item.updated_at = now;
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn remove_item(&self, caller: &Caller, item_id: &str) -> ApiResult<Cart> {
        self.with_cart(caller, |cart| {
            let before = cart.items.len();
            cart.items.retain(|i| i.id != item_id);
            if cart.items.len() == before {
                return Err(ApiError::new(ErrorCode::CartItemNotFound));
            }
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn clear(&self, caller: &Caller) -> ApiResult<Cart> {
        self.with_cart(caller, |cart| {
            cart.items.clear();
            cart.coupons.clear();
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn apply_coupon(&self, caller: &Caller, code: &str) -> ApiResult<CouponApplication> {
        let coupon = self.coupons.read().get(&normalize_code(code)).cloned();
        let cart = self.cart(caller)?;

        let rejection = match &coupon {
            None => Some(CouponRejection::NotFound),
            Some(coupon) if cart.has_coupon(&coupon.code) => Some(CouponRejection::AlreadyApplied),
            Some(coupon) => coupon.check(cart.totals.subtotal, Utc::now()).err(),
        };
        if let Some(rejection) = rejection {
            return Ok(CouponApplication::rejected(cart, rejection));
        }

        if let Some(coupon) = coupon {
            self.with_cart(caller, |cart| {
                cart.add_coupon(coupon);
                Ok(())
            })?;
        }
        Ok(CouponApplication::applied(self.cart(caller)?))
    }

    pub fn remove_coupon(&self, caller: &Caller, code: &str) -> ApiResult<Cart> {
        self.with_cart(caller, |cart| {
            cart.remove_coupon(code);
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn set_shipping_address(
        &self,
        caller: &Caller,
        address: ShippingAddress,
    ) -> ApiResult<Cart> {
        if let DeliveryCheck::Undeliverable(reason) = self.zones.check_address(&address) {
            return Err(ApiError::with_message(
                ErrorCode::UndeliverableAddress,
                reason.to_string(),
            ));
        }
        self.with_cart(caller, |cart| {
            cart.shipping_address = Some(address);
            Ok(())
        })?;
        self.cart(caller)
    }

    pub fn shipping_options(&self, caller: &Caller) -> ApiResult<Vec<ShippingOption>> {
        let cart = self.cart(caller)?;
        let zone = cart
            .shipping_address
            .as_ref()
            .map(|address| self.zones.check_address(address));
        let (extra_fee, days) = match zone {
            Some(DeliveryCheck::Deliverable(zone)) => (zone.extra_fee, zone.estimated_days),
            _ => (Decimal::ZERO, 5),
        };

        let standard = cart.totals.shipping + extra_fee;
        Ok(vec![
            ShippingOption {
                id: "standard".into(),
                label: "Standard delivery".into(),
                fee: standard,
                estimated_days: days,
            },
            ShippingOption {
                id: "express".into(),
                label: "Express delivery".into(),
                fee: standard + self.pricing.flat_shipping_fee,
                estimated_days: days.div_ceil(2),
            },
        ])
    }

    pub fn validate(&self, caller: &Caller) -> ApiResult<CartValidation> {
        let cart = self.cart(caller)?;
        let mut issues = Vec::new();

        for item in cart.active_items() {
            let entry = match self.catalog_entry(&item.item_ref) {
                Ok(entry) => entry,
                Err(_) => {
                    issues.push(CartIssue {
                        item_id: item.id.clone(),
                        kind: IssueKind::Unavailable,
                        message: format!("{} is no longer sold", item.item_ref),
                    });
                    continue;
                }
            };
            if !entry.is_active {
                issues.push(CartIssue {
                    item_id: item.id.clone(),
                    kind: IssueKind::Inactive,
                    message: format!("{} is no longer available", entry.display_name()),
                });
            } else if entry.stock < item.quantity {
                issues.push(CartIssue {
                    item_id: item.id.clone(),
                    kind: IssueKind::InsufficientStock,
                    message: format!("Only {} of {} left", entry.stock, entry.display_name()),
                });
            } else if entry.price.is_some_and(|price| price != item.unit_price) {
                issues.push(CartIssue {
                    item_id: item.id.clone(),
                    kind: IssueKind::PriceChanged,
                    message: format!("The price of {} has changed", entry.display_name()),
                });
            }
        }

        Ok(CartValidation {
            valid: issues.is_empty(),
            issues,
        })
    }
}

fn check_availability(entry: &CatalogEntry, quantity: u32) -> ApiResult<()> {
    entry.check_quantity(quantity).map_err(|issue| {
        let code = match issue {
            AvailabilityIssue::Inactive => ErrorCode::ProductInactive,
            AvailabilityIssue::InsufficientStock { .. } => ErrorCode::ProductOutOfStock,
        };
        ApiError::with_message(code, format!("{} {}", entry.display_name(), issue))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, price: i64, stock: u32) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            name: Some(id.to_uppercase()),
            is_active: true,
            stock,
            price: Some(Decimal::from(price)),
        }
    }

    #[test]
    fn test_add_merges_and_checks_stock() {
        let state = MockState::default();
        state.put_product(entry("p1", 100, 4));
        let caller = Caller::Account("u1".into());

        state.add_item(&caller, NewCartLine::new(ItemRef::product("p1"), 2)).unwrap();
        let cart = state.add_item(&caller, NewCartLine::new(ItemRef::product("p1"), 1)).unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.totals.subtotal, Decimal::from(300));

        let err = state
            .add_item(&caller, NewCartLine::new(ItemRef::product("p1"), 2))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let state = MockState::default();
        state.put_product(entry("p1", 100, 4));
        let caller = Caller::Guest("s1".into());
        let cart = state.add_item(&caller, NewCartLine::new(ItemRef::product("p1"), 2)).unwrap();
        let id = cart.items[0].id.clone();

        let cart = state.update_item(&caller, &id, ItemChanges::quantity(0)).unwrap();
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_coupon_rejections_are_data() {
        let state = MockState::default();
        let caller = Caller::Account("u1".into());
        let app = state.apply_coupon(&caller, "nope").unwrap();
        assert_eq!(app.rejection, Some(CouponRejection::NotFound));
    }

    #[test]
    fn test_validate_reports_missing_product() {
        let state = MockState::default();
        state.put_product(entry("p1", 100, 4));
        let caller = Caller::Account("u1".into());
        state.add_item(&caller, NewCartLine::new(ItemRef::product("p1"), 1)).unwrap();
        state.remove_product("p1");

        let validation = state.validate(&caller).unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.issues[0].kind, IssueKind::Unavailable);
    }
}
