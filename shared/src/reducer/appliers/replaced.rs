//! Wholesale replacement appliers: SET_CART, SET_GUEST_CART,
//! CLEAR_GUEST_CART and REVERT_OPTIMISTIC_UPDATE

use crate::cart::{Cart, GuestCartItem};
use crate::reducer::{CartApplier, CartState};

/// Replace the account cart with the server copy
#[derive(Debug, Clone, PartialEq)]
pub struct SetCart {
    pub cart: Option<Cart>,
}

impl CartApplier for SetCart {
    fn apply(&self, state: &mut CartState) {
        state.cart = self.cart.clone();
        state.is_loading = false;
        state.error = None;
    }
}

/// Replace the guest lines with the persisted list
#[derive(Debug, Clone, PartialEq)]
pub struct SetGuestCart {
    pub items: Vec<GuestCartItem>,
}

impl CartApplier for SetGuestCart {
    fn apply(&self, state: &mut CartState) {
        state.guest_items = self.items.clone();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClearGuestCart;

impl CartApplier for ClearGuestCart {
    fn apply(&self, state: &mut CartState) {
        state.guest_items.clear();
    }
}

/// Restore a prior account-cart snapshot. Last write wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RevertOptimisticUpdate {
    pub snapshot: Option<Cart>,
}

impl CartApplier for RevertOptimisticUpdate {
    fn apply(&self, state: &mut CartState) {
        state.cart = self.snapshot.clone();
    }
}
