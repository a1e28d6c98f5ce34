//! Totals calculation using rust_decimal for precision
//!
//! Totals are always recomputed from the full line list and coupon set;
//! nothing here patches a previous result. All amounts are rounded to
//! 2 decimal places (half away from zero) before they leave this module.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::coupon::{Coupon, CouponEffect, evaluate_coupon, normalize_code};
use super::item::CartItem;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Default subtotal above which shipping is free
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
/// Default flat shipping fee
pub const DEFAULT_FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
/// Default tax rate in percent
pub const DEFAULT_TAX_RATE_PERCENT: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

/// Pricing constants applied by the totals calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    /// Shipping is free when the subtotal is strictly above this amount
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    /// Applied to `subtotal - discount`
    pub tax_rate_percent: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD,
            flat_shipping_fee: DEFAULT_FLAT_SHIPPING_FEE,
            tax_rate_percent: DEFAULT_TAX_RATE_PERCENT,
        }
    }
}

/// Derived cart totals. Never persisted on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Same as `discount`; reported separately for "you saved" messaging
    pub savings: Decimal,
}

/// Round a monetary value to 2 decimal places
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Line total: unit_price * quantity
pub fn calculate_line_total(item: &CartItem) -> Decimal {
    round_money(item.unit_price * Decimal::from(item.quantity))
}

/// Compute cart totals from lines and applied coupons.
///
/// - subtotal: Σ unit_price × quantity over lines not saved for later
/// - discount: Σ per-unit discount × quantity, plus eligible coupon discounts
/// - shipping: zero above the free-shipping threshold or with a shipping coupon
/// - tax: tax rate × (subtotal − discount), never below zero
/// - total: subtotal − discount + shipping + tax, floored at zero
///
/// Duplicate coupon codes are counted once. Ineligible coupons contribute
/// nothing.
pub fn compute_totals(
    items: &[CartItem],
    coupons: &[Coupon],
    config: &PricingConfig,
    now: DateTime<Utc>,
) -> Totals {
    let mut subtotal = Decimal::ZERO;
    let mut item_discount = Decimal::ZERO;

    for item in items.iter().filter(|i| !i.saved_for_later) {
        let quantity = Decimal::from(item.quantity);
        subtotal += item.unit_price * quantity;
        item_discount += item.discount.max(Decimal::ZERO) * quantity;
    }

    let mut coupon_discount = Decimal::ZERO;
    let mut free_shipping = false;
    let mut seen = HashSet::new();

    for coupon in coupons {
        if !seen.insert(normalize_code(&coupon.code)) {
            continue;
        }
        match evaluate_coupon(coupon, subtotal, now) {
            Ok(CouponEffect::Discount(amount)) => coupon_discount += amount,
            Ok(CouponEffect::FreeShipping) => free_shipping = true,
            Err(reason) => {
                debug!(code = %coupon.code, %reason, "Coupon skipped in totals");
            }
        }
    }

    let subtotal = round_money(subtotal);
    let discount = round_money(item_discount + coupon_discount);

    let shipping = if free_shipping || subtotal > config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        round_money(config.flat_shipping_fee)
    };

    let taxable = (subtotal - discount).max(Decimal::ZERO);
    let tax = round_money(taxable * config.tax_rate_percent / Decimal::ONE_HUNDRED);

    let total = (subtotal - discount + shipping + tax).max(Decimal::ZERO);

    Totals {
        subtotal,
        discount,
        shipping,
        tax,
        total,
        savings: discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CouponType, ItemRef};
    use chrono::Duration;

    fn item(product: &str, unit_price: Decimal, quantity: u32) -> CartItem {
        let at = Utc::now();
        CartItem {
            id: format!("line-{}", product),
            item_ref: ItemRef::product(product),
            name: None,
            quantity,
            unit_price,
            original_price: None,
            discount: Decimal::ZERO,
            customizations: Default::default(),
            notes: None,
            saved_for_later: false,
            added_at: at,
            updated_at: at,
        }
    }

    fn coupon(code: &str, coupon_type: CouponType, value: Decimal) -> Coupon {
        Coupon {
            code: code.into(),
            coupon_type,
            value,
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_empty_cart_pays_base_fee_only() {
        let config = PricingConfig::default();
        let totals = compute_totals(&[], &[], &config, Utc::now());

        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.shipping, config.flat_shipping_fee);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, config.flat_shipping_fee);
        assert_eq!(totals.savings, Decimal::ZERO);
    }

    #[test]
    fn test_single_line_below_threshold() {
        let config = PricingConfig::default();
        let items = vec![item("fan", Decimal::from(100), 3)];
        let totals = compute_totals(&items, &[], &config, Utc::now());

        assert_eq!(totals.subtotal, Decimal::from(300));
        assert_eq!(totals.shipping, Decimal::from(100));
        assert_eq!(totals.tax, Decimal::from(54));
        assert_eq!(totals.total, Decimal::from(300 + 100 + 54));
    }

    #[test]
    fn test_free_shipping_above_threshold() {
        let config = PricingConfig::default();
        let items = vec![item("inverter", Decimal::from(12_000), 1)];
        let totals = compute_totals(&items, &[], &config, Utc::now());

        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::from(2160));
        assert_eq!(totals.total, Decimal::from(14_160));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let config = PricingConfig::default();
        let items = vec![item("geyser", config.free_shipping_threshold, 1)];
        let totals = compute_totals(&items, &[], &config, Utc::now());
        assert_eq!(totals.shipping, config.flat_shipping_fee);
    }

    #[test]
    fn test_saved_for_later_lines_are_excluded() {
        let config = PricingConfig::default();
        let mut saved = item("chandelier", Decimal::from(9_000), 1);
        saved.saved_for_later = true;
        let items = vec![item("switch", Decimal::from(50), 2), saved];
        let totals = compute_totals(&items, &[], &config, Utc::now());

        assert_eq!(totals.subtotal, Decimal::from(100));
    }

    #[test]
    fn test_per_item_discount_and_coupons() {
        let config = PricingConfig::default();
        let mut line = item("mcb", Decimal::from(400), 2);
        line.discount = Decimal::from(20);
        let coupons = vec![
            coupon("TEN", CouponType::Percentage, Decimal::from(10)),
            coupon("FLAT50", CouponType::Fixed, Decimal::from(50)),
        ];
        let totals = compute_totals(&[line], &coupons, &config, Utc::now());

        // 40 item discount + 80 (10% of 800) + 50 fixed
        assert_eq!(totals.subtotal, Decimal::from(800));
        assert_eq!(totals.discount, Decimal::from(170));
        assert_eq!(totals.savings, totals.discount);
        // 18% of 630
        assert_eq!(totals.tax, Decimal::new(11340, 2));
        assert_eq!(totals.total, Decimal::new(84340, 2));
    }

    #[test]
    fn test_duplicate_and_invalid_coupons_do_not_count() {
        let config = PricingConfig::default();
        let items = vec![item("wire", Decimal::from(1000), 1)];
        let mut expired = coupon("OLD", CouponType::Fixed, Decimal::from(500));
        expired.expires_at = Some(Utc::now() - Duration::days(1));
        let coupons = vec![
            coupon("flat100", CouponType::Fixed, Decimal::from(100)),
            coupon("FLAT100", CouponType::Fixed, Decimal::from(100)),
            expired,
        ];
        let totals = compute_totals(&items, &coupons, &config, Utc::now());
        assert_eq!(totals.discount, Decimal::from(100));
    }

    #[test]
    fn test_shipping_coupon_waives_fee() {
        let config = PricingConfig::default();
        let items = vec![item("plug", Decimal::from(60), 1)];
        let coupons = vec![coupon("FREESHIP", CouponType::Shipping, Decimal::ZERO)];
        let totals = compute_totals(&items, &coupons, &config, Utc::now());
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
    }

    #[test]
    fn test_total_never_negative() {
        let config = PricingConfig::default();
        let mut line = item("bulb", Decimal::from(10), 1);
        line.discount = Decimal::from(500);
        let coupons = vec![coupon("HUGE", CouponType::Fixed, Decimal::from(10_000))];
        let totals = compute_totals(&[line], &coupons, &config, Utc::now());

        assert!(totals.total >= Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
    }

    #[test]
    fn test_no_negative_amounts_across_discount_mixes() {
        let config = PricingConfig::default();
        let now = Utc::now();
        let prices = [Decimal::new(1, 2), Decimal::new(4999, 2), Decimal::from(20_000)];
        let item_discounts = [Decimal::ZERO, Decimal::from(30), Decimal::from(-5)];
        let mut capped = coupon("CAP", CouponType::Percentage, Decimal::from(90));
        capped.max_discount = Some(Decimal::from(25));
        let coupon_sets = [
            vec![],
            vec![coupon("ALL", CouponType::Percentage, Decimal::from(100))],
            vec![coupon("BIG", CouponType::Fixed, Decimal::from(50_000))],
            vec![coupon("SHIP", CouponType::Shipping, Decimal::ZERO), capped],
            vec![
                coupon("HALF", CouponType::Percentage, Decimal::from(50)),
                coupon("FLAT", CouponType::Fixed, Decimal::from(75)),
            ],
        ];

        for price in prices {
            for quantity in [1, 3, 250] {
                for discount in item_discounts {
                    for coupons in &coupon_sets {
                        let mut line = item("mix", price, quantity);
                        line.discount = discount;
                        let t = compute_totals(&[line], coupons, &config, now);
                        let label = format!("{} x{} -{} {:?}", price, quantity, discount, coupons);

                        assert!(t.subtotal >= Decimal::ZERO, "subtotal: {}", label);
                        assert!(t.discount >= Decimal::ZERO, "discount: {}", label);
                        assert!(t.shipping >= Decimal::ZERO, "shipping: {}", label);
                        assert!(t.tax >= Decimal::ZERO, "tax: {}", label);
                        assert!(t.total >= Decimal::ZERO, "total: {}", label);
                        assert_eq!(t.savings, t.discount, "{}", label);
                    }
                }
            }
        }
    }

    #[test]
    fn test_compute_totals_is_deterministic() {
        let config = PricingConfig::default();
        let now = Utc::now();
        let items = vec![
            item("a", Decimal::new(1999, 2), 3),
            item("b", Decimal::new(333, 2), 7),
        ];
        let coupons = vec![coupon("P", CouponType::Percentage, Decimal::new(125, 1))];

        let first = compute_totals(&items, &coupons, &config, now);
        let second = compute_totals(&items, &coupons, &config, now);
        assert_eq!(first, second);
        assert_eq!(first.subtotal, Decimal::new(8328, 2));
    }

    #[test]
    fn test_to_decimal_precision() {
        // 0.1 * 3 in f64 drifts; Decimal does not
        let line = item("fuse", Decimal::new(1, 1), 3);
        assert_eq!(calculate_line_total(&line), Decimal::new(3, 1));
    }
}
