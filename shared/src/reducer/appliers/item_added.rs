//! ADD_ITEM_OPTIMISTIC applier
//!
//! Merges by natural key: a second add of the same product or service
//! folds into the existing line instead of appending a duplicate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::touch_account_cart;
use crate::cart::{
    Cart, CartItem, CartOwner, GuestCartItem, NewCartLine, merge_customizations, merge_notes,
};
use crate::reducer::{CartApplier, CartState, CartTarget};

/// Placeholder id for an account cart that the server has not created yet
pub const PENDING_CART_ID: &str = "pending";

#[derive(Debug, Clone, PartialEq)]
pub struct AddItemOptimistic {
    pub target: CartTarget,
    /// Id given to the line if no line with the same key exists
    pub line_id: String,
    pub line: NewCartLine,
    pub unit_price: Decimal,
    pub at: DateTime<Utc>,
}

impl CartApplier for AddItemOptimistic {
    fn apply(&self, state: &mut CartState) {
        if self.line.quantity == 0 {
            return;
        }
        match self.target {
            CartTarget::Guest => {
                add_or_merge_guest_item(&mut state.guest_items, &self.line_id, &self.line, self.at);
            }
            CartTarget::Account => {
                let cart = state.cart.get_or_insert_with(|| {
                    Cart::new(
                        PENDING_CART_ID,
                        CartOwner::Account {
                            user_id: String::new(),
                        },
                        self.at,
                    )
                });
                add_or_merge_account_item(cart, self);
                touch_account_cart(state, self.at);
            }
        }
    }
}

/// Add a guest line, merging with an existing line of the same key
pub fn add_or_merge_guest_item(
    items: &mut Vec<GuestCartItem>,
    line_id: &str,
    line: &NewCartLine,
    at: DateTime<Utc>,
) {
    if let Some(existing) = items.iter_mut().find(|i| i.item_ref == line.item_ref) {
        existing.absorb(line, at);
    } else {
        items.push(GuestCartItem::new(line_id.to_string(), line, at));
    }
}

fn add_or_merge_account_item(cart: &mut Cart, action: &AddItemOptimistic) {
    let line = &action.line;
    if let Some(existing) = cart.items.iter_mut().find(|i| i.item_ref == line.item_ref) {
        existing.quantity = existing.quantity.saturating_add(line.quantity);
        merge_customizations(&mut existing.customizations, &line.customizations);
        merge_notes(&mut existing.notes, line.notes.as_deref());
        // a line parked for later comes back when added again
        existing.saved_for_later = false;
        existing.added_at = action.at;
        existing.updated_at = action.at;
    } else {
        cart.items.push(CartItem {
            id: action.line_id.clone(),
            item_ref: line.item_ref.clone(),
            name: None,
            quantity: line.quantity,
            unit_price: action.unit_price,
            original_price: None,
            discount: Decimal::ZERO,
            customizations: line.customizations.clone(),
            notes: line.notes.clone().filter(|n| !n.trim().is_empty()),
            saved_for_later: false,
            added_at: action.at,
            updated_at: action.at,
        });
    }
}
