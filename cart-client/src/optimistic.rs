//! Optimistic mutations
//!
//! A mutation is prepared against the current state and yields three
//! things: the state to show right away, the actions that commit a
//! server result, and the actions that roll back after a failure. The
//! type is pure; [`crate::store::CartStore`] does the awaiting.

use shared::cart::Cart;
use shared::reducer::{CartAction, CartState, reduce};

use crate::ClientError;

#[derive(Debug, Clone)]
pub struct OptimisticMutation {
    label: &'static str,
    action: CartAction,
    /// Account cart before the mutation
    snapshot: Option<Cart>,
    optimistic: CartState,
}

impl OptimisticMutation {
    pub fn prepare(state: &CartState, label: &'static str, action: CartAction) -> Self {
        Self {
            label,
            snapshot: state.cart.clone(),
            optimistic: reduce(state, &action),
            action,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn action(&self) -> &CartAction {
        &self.action
    }

    /// State to show while the request is in flight
    pub fn optimistic_state(&self) -> &CartState {
        &self.optimistic
    }

    /// The cart the UI showed before the mutation
    pub fn snapshot(&self) -> Option<&Cart> {
        self.snapshot.as_ref()
    }

    /// The server accepted: its cart replaces the optimistic one
    pub fn commit(&self, server_cart: Cart) -> Vec<CartAction> {
        vec![CartAction::set_cart(Some(server_cart))]
    }

    /// The server refused or was unreachable: restore and report
    pub fn rollback(&self, error: &ClientError) -> Vec<CartAction> {
        vec![
            CartAction::revert(self.snapshot.clone()),
            CartAction::set_error(error.user_message()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::cart::{CartOwner, ItemRef, NewCartLine};
    use shared::reducer::CartTarget;

    fn state_with_cart() -> CartState {
        let cart = Cart::new(
            "cart-1",
            CartOwner::Account {
                user_id: "u1".into(),
            },
            Utc::now(),
        );
        CartState {
            cart: Some(cart),
            ..Default::default()
        }
    }

    fn add_p1() -> CartAction {
        CartAction::add_item(
            CartTarget::Account,
            "local-1",
            NewCartLine::new(ItemRef::product("p1"), 1),
            Decimal::from(80),
            Utc::now(),
        )
    }

    #[test]
    fn test_rollback_restores_snapshot_and_reports() {
        let before = state_with_cart();
        let mutation = OptimisticMutation::prepare(&before, "add", add_p1());
        assert_eq!(mutation.optimistic_state().cart.as_ref().unwrap().items.len(), 1);

        let mut state = mutation.optimistic_state().clone();
        let error = ClientError::Validation("Insufficient stock".into());
        for action in mutation.rollback(&error) {
            state = reduce(&state, &action);
        }
        assert_eq!(state.cart, before.cart);
        assert_eq!(state.error.as_deref(), Some("Validation error: Insufficient stock"));
    }

    #[test]
    fn test_commit_takes_server_cart() {
        let before = state_with_cart();
        let mutation = OptimisticMutation::prepare(&before, "add", add_p1());

        let mut server_cart = before.cart.clone().unwrap();
        server_cart.id = "cart-from-server".into();
        let mut state = mutation.optimistic_state().clone();
        for action in mutation.commit(server_cart.clone()) {
            state = reduce(&state, &action);
        }
        assert_eq!(state.cart, Some(server_cart));
    }
}
