//! REMOVE_ITEM_OPTIMISTIC applier

use chrono::{DateTime, Utc};

use super::touch_account_cart;
use crate::reducer::{CartApplier, CartState, CartTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveItemOptimistic {
    pub target: CartTarget,
    pub item_id: String,
    pub at: DateTime<Utc>,
}

impl CartApplier for RemoveItemOptimistic {
    fn apply(&self, state: &mut CartState) {
        match self.target {
            CartTarget::Guest => state.guest_items.retain(|i| i.id != self.item_id),
            CartTarget::Account => {
                let Some(cart) = state.cart.as_mut() else {
                    return;
                };
                let before = cart.items.len();
                cart.items.retain(|i| i.id != self.item_id);
                if cart.items.len() != before {
                    touch_account_cart(state, self.at);
                }
            }
        }
    }
}
