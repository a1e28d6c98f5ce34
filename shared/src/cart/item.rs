//! Cart line types
//!
//! A line points at exactly one catalog entry, a product or a service.
//! [`ItemRef`] is that pointer and doubles as the natural key used to
//! deduplicate lines: two lines with equal `ItemRef` never coexist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque per-line options (colour, wattage, installation slot...)
pub type Customizations = BTreeMap<String, serde_json::Value>;

/// What a cart line refers to. Also the natural key of the line.
///
/// Flattened into the owning struct as either `productId` or `serviceId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Product {
        #[serde(rename = "productId")]
        product_id: String,
    },
    Service {
        #[serde(rename = "serviceId")]
        service_id: String,
    },
}

impl ItemRef {
    pub fn product(id: impl Into<String>) -> Self {
        ItemRef::Product {
            product_id: id.into(),
        }
    }

    pub fn service(id: impl Into<String>) -> Self {
        ItemRef::Service {
            service_id: id.into(),
        }
    }

    /// Build a reference from the optional id pair used by callers.
    ///
    /// Returns `None` when neither id is usable. A product id wins when
    /// both are supplied.
    pub fn from_ids(product_id: Option<&str>, service_id: Option<&str>) -> Option<Self> {
        fn non_blank(id: Option<&str>) -> Option<&str> {
            id.map(str::trim).filter(|id| !id.is_empty())
        }
        match (non_blank(product_id), non_blank(service_id)) {
            (Some(p), _) => Some(Self::product(p)),
            (None, Some(s)) => Some(Self::service(s)),
            (None, None) => None,
        }
    }

    /// The referenced catalog id
    pub fn id(&self) -> &str {
        match self {
            ItemRef::Product { product_id } => product_id,
            ItemRef::Service { service_id } => service_id,
        }
    }

    /// Catalog path segment for this reference (`products` / `services`)
    pub fn catalog_collection(&self) -> &'static str {
        match self {
            ItemRef::Product { .. } => "products",
            ItemRef::Service { .. } => "services",
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Product { product_id } => write!(f, "product {}", product_id),
            ItemRef::Service { service_id } => write!(f, "service {}", service_id),
        }
    }
}

/// Shallow-merge `incoming` into `existing`; incoming keys overwrite.
pub fn merge_customizations(existing: &mut Customizations, incoming: &Customizations) {
    for (key, value) in incoming {
        existing.insert(key.clone(), value.clone());
    }
}

/// Replace notes only when a non-blank value is supplied.
pub fn merge_notes(existing: &mut Option<String>, incoming: Option<&str>) {
    if let Some(notes) = incoming.filter(|n| !n.trim().is_empty()) {
        *existing = Some(notes.to_string());
    }
}

/// Account cart line as returned by the cart API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    #[serde(flatten)]
    pub item_ref: ItemRef,
    /// Display name snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    /// Per-unit discount
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub customizations: Customizations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub saved_for_later: bool,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Savings against the original price, per unit
    pub fn markdown(&self) -> Decimal {
        self.original_price
            .map(|original| (original - self.unit_price).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Guest cart line persisted in local storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCartItem {
    pub id: String,
    #[serde(flatten)]
    pub item_ref: ItemRef,
    pub quantity: u32,
    #[serde(default)]
    pub customizations: Customizations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl GuestCartItem {
    pub fn new(id: String, line: &NewCartLine, at: DateTime<Utc>) -> Self {
        Self {
            id,
            item_ref: line.item_ref.clone(),
            quantity: line.quantity,
            customizations: line.customizations.clone(),
            notes: line.notes.clone().filter(|n| !n.trim().is_empty()),
            added_at: at,
        }
    }

    /// Fold another add of the same natural key into this line
    pub fn absorb(&mut self, line: &NewCartLine, at: DateTime<Utc>) {
        self.quantity = self.quantity.saturating_add(line.quantity);
        merge_customizations(&mut self.customizations, &line.customizations);
        merge_notes(&mut self.notes, line.notes.as_deref());
        self.added_at = at;
    }
}

/// Request to add a line to a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartLine {
    #[serde(flatten)]
    pub item_ref: ItemRef,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub customizations: Customizations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewCartLine {
    pub fn new(item_ref: ItemRef, quantity: u32) -> Self {
        Self {
            item_ref,
            quantity,
            customizations: Customizations::new(),
            notes: None,
        }
    }

    pub fn with_customization(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.customizations.insert(key.into(), value.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of an existing line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_for_later: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
}

impl ItemChanges {
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn saved_for_later(saved: bool) -> Self {
        Self {
            saved_for_later: Some(saved),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.saved_for_later.is_none()
            && self.notes.is_none()
            && self.customizations.is_none()
    }
}

/// Backend-neutral view of a line, used by the migration and backend seam
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub id: String,
    pub item_ref: ItemRef,
    pub quantity: u32,
    pub customizations: Customizations,
    pub notes: Option<String>,
    /// Parked lines do not count towards the order. Guest lines never are.
    pub saved_for_later: bool,
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            item_ref: item.item_ref.clone(),
            quantity: item.quantity,
            customizations: item.customizations.clone(),
            notes: item.notes.clone(),
            saved_for_later: item.saved_for_later,
        }
    }
}

impl From<&GuestCartItem> for CartLine {
    fn from(item: &GuestCartItem) -> Self {
        Self {
            id: item.id.clone(),
            item_ref: item.item_ref.clone(),
            quantity: item.quantity,
            customizations: item.customizations.clone(),
            notes: item.notes.clone(),
            saved_for_later: false,
        }
    }
}
