//! Cart action appliers
//!
//! Each applier implements [`CartApplier`] and handles exactly one action.
//! Mutating actions carry a [`CartTarget`] and the timestamp to stamp on
//! touched lines, so applying the same action twice yields equal states.

use chrono::{DateTime, Utc};
use enum_dispatch::enum_dispatch;
use rust_decimal::Decimal;

use super::{CartApplier, CartState, CartTarget, MigrationStatus};
use crate::cart::{Cart, GuestCartItem, NewCartLine};

mod item_added;
mod item_removed;
mod quantity_updated;
mod replaced;
mod status;

pub use item_added::{AddItemOptimistic, add_or_merge_guest_item};
pub use item_removed::RemoveItemOptimistic;
pub use quantity_updated::UpdateQuantityOptimistic;
pub use replaced::{ClearGuestCart, RevertOptimisticUpdate, SetCart, SetGuestCart};
pub use status::{SetError, SetLoading, SetMigrationStatus};

/// The closed set of cart state transitions
#[enum_dispatch(CartApplier)]
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    SetLoading(SetLoading),
    SetError(SetError),
    SetCart(SetCart),
    SetGuestCart(SetGuestCart),
    AddItemOptimistic(AddItemOptimistic),
    RemoveItemOptimistic(RemoveItemOptimistic),
    UpdateQuantityOptimistic(UpdateQuantityOptimistic),
    ClearGuestCart(ClearGuestCart),
    SetMigrationStatus(SetMigrationStatus),
    RevertOptimisticUpdate(RevertOptimisticUpdate),
}

impl CartAction {
    pub fn set_loading(loading: bool) -> Self {
        SetLoading { loading }.into()
    }

    pub fn set_error(error: impl Into<String>) -> Self {
        SetError {
            error: Some(error.into()),
        }
        .into()
    }

    pub fn clear_error() -> Self {
        SetError { error: None }.into()
    }

    pub fn set_cart(cart: Option<Cart>) -> Self {
        SetCart { cart }.into()
    }

    pub fn set_guest_cart(items: Vec<GuestCartItem>) -> Self {
        SetGuestCart { items }.into()
    }

    /// Optimistic add. `unit_price` is only used on the account path.
    pub fn add_item(
        target: CartTarget,
        line_id: impl Into<String>,
        line: NewCartLine,
        unit_price: Decimal,
        at: DateTime<Utc>,
    ) -> Self {
        AddItemOptimistic {
            target,
            line_id: line_id.into(),
            line,
            unit_price,
            at,
        }
        .into()
    }

    pub fn remove_item(target: CartTarget, item_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        RemoveItemOptimistic {
            target,
            item_id: item_id.into(),
            at,
        }
        .into()
    }

    pub fn update_quantity(
        target: CartTarget,
        item_id: impl Into<String>,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Self {
        UpdateQuantityOptimistic {
            target,
            item_id: item_id.into(),
            quantity,
            at,
        }
        .into()
    }

    pub fn clear_guest_cart() -> Self {
        ClearGuestCart.into()
    }

    pub fn set_migration_status(status: MigrationStatus) -> Self {
        SetMigrationStatus { status }.into()
    }

    pub fn revert(snapshot: Option<Cart>) -> Self {
        RevertOptimisticUpdate { snapshot }.into()
    }

    /// Short action name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::SetLoading(_) => "SET_LOADING",
            CartAction::SetError(_) => "SET_ERROR",
            CartAction::SetCart(_) => "SET_CART",
            CartAction::SetGuestCart(_) => "SET_GUEST_CART",
            CartAction::AddItemOptimistic(_) => "ADD_ITEM_OPTIMISTIC",
            CartAction::RemoveItemOptimistic(_) => "REMOVE_ITEM_OPTIMISTIC",
            CartAction::UpdateQuantityOptimistic(_) => "UPDATE_QUANTITY_OPTIMISTIC",
            CartAction::ClearGuestCart(_) => "CLEAR_GUEST_CART",
            CartAction::SetMigrationStatus(_) => "SET_MIGRATION_STATUS",
            CartAction::RevertOptimisticUpdate(_) => "REVERT_OPTIMISTIC_UPDATE",
        }
    }
}

/// Recompute account totals after a line mutation
fn touch_account_cart(state: &mut CartState, at: DateTime<Utc>) {
    let pricing = state.pricing.clone();
    if let Some(cart) = state.cart.as_mut() {
        cart.updated_at = at;
        cart.recalculate(&pricing, at);
    }
}
