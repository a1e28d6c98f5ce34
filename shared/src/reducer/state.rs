use serde::{Deserialize, Serialize};

use crate::cart::{Cart, GuestCartItem, PricingConfig};

/// Which cart a mutating action targets. The two paths never cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartTarget {
    /// Local guest list; no totals are stored for it
    Guest,
    /// Server-backed account cart; totals recomputed on every mutation
    Account,
}

/// Guest → account migration progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    #[default]
    Idle,
    ValidatingItems,
    Merging,
    Success,
    PartialSuccess,
    Failure,
}

impl MigrationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, MigrationStatus::ValidatingItems | MigrationStatus::Merging)
    }
}

/// Single source of truth for the cart UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Account cart (cache of the server copy)
    pub cart: Option<Cart>,
    /// Guest lines (mirror of local storage)
    pub guest_items: Vec<GuestCartItem>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub migration_status: MigrationStatus,
    /// Constants used when optimistic mutations recompute account totals
    pub pricing: PricingConfig,
}

impl CartState {
    pub fn with_pricing(pricing: PricingConfig) -> Self {
        Self {
            pricing,
            ..Default::default()
        }
    }

    /// Item count for the active target
    pub fn items_count(&self, target: CartTarget) -> u32 {
        match target {
            CartTarget::Guest => self.guest_items.iter().map(|i| i.quantity).sum(),
            CartTarget::Account => self.cart.as_ref().map(Cart::items_count).unwrap_or(0),
        }
    }
}
