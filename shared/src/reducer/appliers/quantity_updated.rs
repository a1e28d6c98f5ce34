//! UPDATE_QUANTITY_OPTIMISTIC applier
//!
//! Replaces the quantity in place. A zero quantity is stored as given;
//! routing "quantity ≤ 0" to a removal is the caller's job.

use chrono::{DateTime, Utc};

use super::touch_account_cart;
use crate::reducer::{CartApplier, CartState, CartTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuantityOptimistic {
    pub target: CartTarget,
    pub item_id: String,
    pub quantity: u32,
    pub at: DateTime<Utc>,
}

impl CartApplier for UpdateQuantityOptimistic {
    fn apply(&self, state: &mut CartState) {
        match self.target {
            CartTarget::Guest => {
                if let Some(item) = state.guest_items.iter_mut().find(|i| i.id == self.item_id) {
                    item.quantity = self.quantity;
                }
            }
            CartTarget::Account => {
                let Some(item) = state
                    .cart
                    .as_mut()
                    .and_then(|cart| cart.items.iter_mut().find(|i| i.id == self.item_id))
                else {
                    return;
                };
                item.quantity = self.quantity;
                item.updated_at = self.at;
                touch_account_cart(state, self.at);
            }
        }
    }
}
