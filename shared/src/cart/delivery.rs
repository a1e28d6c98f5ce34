//! Shipping address, shipping options and delivery-zone lookup
//!
//! Zones are matched by the longest postal-code prefix. The default table
//! covers the metro areas the store ships to; callers may supply their own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub id: String,
    pub label: String,
    pub fee: Decimal,
    pub estimated_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryZone {
    pub name: String,
    pub prefixes: Vec<String>,
    pub deliverable: bool,
    #[serde(default)]
    pub extra_fee: Decimal,
    pub estimated_days: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryCheck {
    Deliverable(DeliveryZone),
    Undeliverable(UndeliverableReason),
}

impl DeliveryCheck {
    pub fn is_deliverable(&self) -> bool {
        matches!(self, DeliveryCheck::Deliverable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UndeliverableReason {
    #[error("Postal code must be 6 digits")]
    InvalidPostalCode,
    #[error("Delivery to {zone} is currently paused")]
    NotServiced { zone: String },
    #[error("We do not deliver to this postal code yet")]
    OutsideServiceArea,
}

/// Postal-code prefix → zone lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryZones {
    zones: Vec<DeliveryZone>,
}

impl DeliveryZones {
    pub fn new(zones: Vec<DeliveryZone>) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &[DeliveryZone] {
        &self.zones
    }

    /// Find the zone for a postal code
    pub fn check(&self, postal_code: &str) -> DeliveryCheck {
        let code = postal_code.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return DeliveryCheck::Undeliverable(UndeliverableReason::InvalidPostalCode);
        }

        let best = self
            .zones
            .iter()
            .filter_map(|zone| {
                zone.prefixes
                    .iter()
                    .filter(|prefix| code.starts_with(prefix.as_str()))
                    .map(|prefix| prefix.len())
                    .max()
                    .map(|len| (len, zone))
            })
            .max_by_key(|(len, _)| *len);

        match best {
            Some((_, zone)) if zone.deliverable => DeliveryCheck::Deliverable(zone.clone()),
            Some((_, zone)) => DeliveryCheck::Undeliverable(UndeliverableReason::NotServiced {
                zone: zone.name.clone(),
            }),
            None => DeliveryCheck::Undeliverable(UndeliverableReason::OutsideServiceArea),
        }
    }

    pub fn check_address(&self, address: &ShippingAddress) -> DeliveryCheck {
        self.check(&address.postal_code)
    }
}

impl Default for DeliveryZones {
    fn default() -> Self {
        let zone = |name: &str, prefixes: &[&str], deliverable: bool, extra_fee: i64, days: u32| {
            DeliveryZone {
                name: name.to_string(),
                prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
                deliverable,
                extra_fee: Decimal::from(extra_fee),
                estimated_days: days,
            }
        };
        Self::new(vec![
            zone("local", &["560"], true, 0, 1),
            zone("metro", &["110", "400", "500", "600", "700"], true, 0, 3),
            zone("south", &["5", "6"], true, 50, 5),
            zone("west", &["3", "4"], true, 50, 6),
            zone("north-east", &["78", "79"], false, 150, 10),
        ])
    }
}
