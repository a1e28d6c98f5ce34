//! Coupon rules
//!
//! Eligibility is re-evaluated on every totals computation and never
//! cached: a coupon valid a second ago may be expired or below its
//! minimum now.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    /// `value` percent off the subtotal, capped by `max_discount`
    Percentage,
    /// `value` off the subtotal, never more than the subtotal
    Fixed,
    /// Waives the shipping fee
    Shipping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// What an eligible coupon does to the totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponEffect {
    Discount(Decimal),
    FreeShipping,
}

/// Why a coupon does not apply. Reported to the shopper, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum CouponRejection {
    #[error("Coupon code not found")]
    NotFound,
    #[error("This coupon is no longer active")]
    Inactive,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("Add items worth {required} to use this coupon")]
    #[serde(rename_all = "camelCase")]
    MinimumNotMet { required: Decimal },
    #[error("This coupon is already applied")]
    AlreadyApplied,
}

impl CouponRejection {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CouponRejection::NotFound => ErrorCode::CouponNotFound,
            CouponRejection::Inactive => ErrorCode::CouponInactive,
            CouponRejection::Expired => ErrorCode::CouponExpired,
            CouponRejection::UsageLimitReached => ErrorCode::CouponUsageLimitReached,
            CouponRejection::MinimumNotMet { .. } => ErrorCode::CouponMinimumNotMet,
            CouponRejection::AlreadyApplied => ErrorCode::CouponAlreadyApplied,
        }
    }
}

/// Canonical form of a coupon code (codes are case-insensitive)
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Coupon {
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }

    /// Check eligibility against the current subtotal
    pub fn check(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponRejection::UsageLimitReached);
        }
        if let Some(required) = self.min_order_amount.filter(|required| subtotal < *required) {
            return Err(CouponRejection::MinimumNotMet { required });
        }
        Ok(())
    }
}

/// Evaluate a coupon against a subtotal at a point in time
pub fn evaluate_coupon(
    coupon: &Coupon,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<CouponEffect, CouponRejection> {
    coupon.check(subtotal, now)?;

    let value = coupon.value.max(Decimal::ZERO);
    let effect = match coupon.coupon_type {
        CouponType::Percentage => {
            let raw = subtotal * value / Decimal::ONE_HUNDRED;
            let capped = match coupon.max_discount {
                Some(cap) => raw.min(cap.max(Decimal::ZERO)),
                None => raw,
            };
            CouponEffect::Discount(capped)
        }
        CouponType::Fixed => CouponEffect::Discount(value.min(subtotal.max(Decimal::ZERO))),
        CouponType::Shipping => CouponEffect::FreeShipping,
    };
    Ok(effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(coupon_type: CouponType, value: i64) -> Coupon {
        Coupon {
            code: "SAVE".into(),
            coupon_type,
            value: Decimal::from(value),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_is_capped_by_max_discount() {
        let mut c = coupon(CouponType::Percentage, 10);
        let now = Utc::now();
        assert_eq!(
            evaluate_coupon(&c, Decimal::from(5000), now),
            Ok(CouponEffect::Discount(Decimal::from(500)))
        );

        c.max_discount = Some(Decimal::from(200));
        assert_eq!(
            evaluate_coupon(&c, Decimal::from(5000), now),
            Ok(CouponEffect::Discount(Decimal::from(200)))
        );
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let c = coupon(CouponType::Fixed, 500);
        assert_eq!(
            evaluate_coupon(&c, Decimal::from(300), Utc::now()),
            Ok(CouponEffect::Discount(Decimal::from(300)))
        );
    }

    #[test]
    fn test_rejection_reasons() {
        let now = Utc::now();

        let mut inactive = coupon(CouponType::Fixed, 50);
        inactive.is_active = false;
        assert_eq!(inactive.check(Decimal::from(100), now), Err(CouponRejection::Inactive));

        let mut expired = coupon(CouponType::Fixed, 50);
        expired.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(expired.check(Decimal::from(100), now), Err(CouponRejection::Expired));

        let mut used_up = coupon(CouponType::Fixed, 50);
        used_up.usage_limit = Some(3);
        used_up.used_count = 3;
        assert_eq!(
            used_up.check(Decimal::from(100), now),
            Err(CouponRejection::UsageLimitReached)
        );

        let mut minimum = coupon(CouponType::Fixed, 50);
        minimum.min_order_amount = Some(Decimal::from(1000));
        let rejection = minimum.check(Decimal::from(999), now).unwrap_err();
        assert_eq!(
            rejection,
            CouponRejection::MinimumNotMet {
                required: Decimal::from(1000)
            }
        );
        assert_eq!(rejection.to_string(), "Add items worth 1000 to use this coupon");
        assert_eq!(rejection.error_code(), ErrorCode::CouponMinimumNotMet);
    }

    #[test]
    fn test_rejection_wire_shape() {
        let json = serde_json::to_value(CouponRejection::UsageLimitReached).unwrap();
        assert_eq!(json, serde_json::json!({ "reason": "usage-limit-reached" }));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  diwali10 "), "DIWALI10");
    }
}
