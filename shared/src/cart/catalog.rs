//! Catalog availability and cart validation types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Availability fields of a product or service, as served by the catalog API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_active: bool,
    /// Units on hand. Services report their remaining booking slots.
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityIssue {
    #[error("is no longer available")]
    Inactive,
    #[error("has only {available} left in stock (requested {requested})")]
    InsufficientStock { available: u32, requested: u32 },
}

impl CatalogEntry {
    /// Check that `quantity` units can be ordered
    pub fn check_quantity(&self, quantity: u32) -> Result<(), AvailabilityIssue> {
        if !self.is_active {
            return Err(AvailabilityIssue::Inactive);
        }
        if self.stock < quantity {
            return Err(AvailabilityIssue::InsufficientStock {
                available: self.stock,
                requested: quantity,
            });
        }
        Ok(())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Unavailable,
    Inactive,
    InsufficientStock,
    PriceChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIssue {
    pub item_id: String,
    pub kind: IssueKind,
    pub message: String,
}

/// Result of a server-side cart validation before checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValidation {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<CartIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(is_active: bool, stock: u32) -> CatalogEntry {
        CatalogEntry {
            id: "p1".into(),
            name: Some("Ceiling fan".into()),
            is_active,
            stock,
            price: None,
        }
    }

    #[test]
    fn test_check_quantity() {
        assert_eq!(entry(true, 5).check_quantity(5), Ok(()));
        assert_eq!(entry(false, 5).check_quantity(1), Err(AvailabilityIssue::Inactive));
        assert_eq!(
            entry(true, 2).check_quantity(3),
            Err(AvailabilityIssue::InsufficientStock {
                available: 2,
                requested: 3
            })
        );
    }
}
