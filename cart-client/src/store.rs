//! Cart store
//!
//! Owns the [`CartState`] the UI renders and routes every cart intent to
//! the right place: guest lines go to local storage, account lines go
//! through the cart service as optimistic mutations.

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::cart::{Cart, ItemChanges, NewCartLine, PricingConfig};
use shared::reducer::{CartAction, CartApplier, CartState, CartTarget};
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::guest::GuestCartStore;
use crate::http::{HttpClient, NetworkHttpClient};
use crate::optimistic::OptimisticMutation;
use crate::service::{CartService, CouponOutcome};
use crate::{ClientError, ClientResult};

pub struct CartStore<H: HttpClient = NetworkHttpClient> {
    state: RwLock<CartState>,
    guest: Arc<GuestCartStore>,
    service: Arc<CartService<H>>,
}

impl<H: HttpClient> CartStore<H> {
    pub fn new(
        guest: Arc<GuestCartStore>,
        service: Arc<CartService<H>>,
        pricing: PricingConfig,
    ) -> Self {
        let mut state = CartState::with_pricing(pricing);
        state.guest_items = guest.items();
        state.cart = service.cached_cart();
        Self {
            state: RwLock::new(state),
            guest,
            service,
        }
    }

    pub fn state(&self) -> CartState {
        self.state.read().clone()
    }

    pub fn guest(&self) -> &Arc<GuestCartStore> {
        &self.guest
    }

    pub fn service(&self) -> &Arc<CartService<H>> {
        &self.service
    }

    pub fn dispatch(&self, action: CartAction) {
        trace!(action = action.name(), "Cart action");
        action.apply(&mut self.state.write());
    }

    /// Which cart intents currently act on
    pub fn target(&self) -> CartTarget {
        if self.service.is_authenticated() {
            CartTarget::Account
        } else {
            CartTarget::Guest
        }
    }

    pub fn items_count(&self) -> u32 {
        self.state.read().items_count(self.target())
    }

    /// Add a line. `unit_price` prices the optimistic account line until
    /// the server answers.
    pub async fn add_item(&self, line: NewCartLine, unit_price: Decimal) -> ClientResult<()> {
        if line.quantity == 0 {
            return Err(ClientError::Validation("Quantity must be at least 1".into()));
        }
        match self.target() {
            CartTarget::Guest => {
                self.guest.add_line(&line)?;
                self.sync_guest();
                Ok(())
            }
            CartTarget::Account => {
                let action = CartAction::add_item(
                    CartTarget::Account,
                    shared::util::new_line_id(),
                    line.clone(),
                    unit_price,
                    Utc::now(),
                );
                self.run_optimistic("add", action, self.service.add_item(&line)).await
            }
        }
    }

    /// Set a line's quantity. Anything ≤ 0 removes the line.
    pub async fn update_quantity(&self, item_id: &str, quantity: i64) -> ClientResult<()> {
        if quantity <= 0 {
            return self.remove_item(item_id).await;
        }
        match self.target() {
            CartTarget::Guest => {
                self.guest.update_guest_cart_quantity(item_id, quantity)?;
                self.sync_guest();
                Ok(())
            }
            CartTarget::Account => {
                let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                let action =
                    CartAction::update_quantity(CartTarget::Account, item_id, quantity, Utc::now());
                let changes = ItemChanges::quantity(quantity);
                self.run_optimistic("update", action, self.service.update_item(item_id, &changes))
                    .await
            }
        }
    }

    pub async fn remove_item(&self, item_id: &str) -> ClientResult<()> {
        match self.target() {
            CartTarget::Guest => {
                self.guest.remove_from_guest_cart(item_id)?;
                self.sync_guest();
                Ok(())
            }
            CartTarget::Account => {
                let action = CartAction::remove_item(CartTarget::Account, item_id, Utc::now());
                self.run_optimistic("remove", action, self.service.remove_item(item_id))
                    .await
            }
        }
    }

    pub async fn clear(&self) -> ClientResult<()> {
        match self.target() {
            CartTarget::Guest => {
                self.guest.clear_guest_cart()?;
                self.dispatch(CartAction::clear_guest_cart());
                Ok(())
            }
            CartTarget::Account => self.load(self.service.clear_cart()).await,
        }
    }

    /// Apply a coupon. A rejection leaves the cart alone and shows the reason.
    pub async fn apply_coupon(&self, code: &str) -> ClientResult<CouponOutcome> {
        let outcome = match self.service.apply_coupon(code).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.dispatch(CartAction::set_error(e.user_message()));
                return Err(e);
            }
        };
        match &outcome {
            CouponOutcome::Applied(cart) => self.dispatch(CartAction::set_cart(Some(cart.clone()))),
            CouponOutcome::Rejected { reason } => {
                self.dispatch(CartAction::set_error(reason.to_string()))
            }
        }
        Ok(outcome)
    }

    pub async fn remove_coupon(&self, code: &str) -> ClientResult<()> {
        self.load(self.service.remove_coupon(code)).await
    }

    /// Re-read the active cart into state
    pub async fn refresh(&self) -> ClientResult<()> {
        match self.target() {
            CartTarget::Guest => {
                self.guest.reload();
                self.sync_guest();
                Ok(())
            }
            CartTarget::Account => self.load(self.service.get_cart()).await,
        }
    }

    fn sync_guest(&self) {
        self.dispatch(CartAction::set_guest_cart(self.guest.items()));
    }

    /// Non-optimistic request: loading while it runs, then cart or error
    async fn load<F>(&self, request: F) -> ClientResult<()>
    where
        F: Future<Output = ClientResult<Cart>>,
    {
        self.dispatch(CartAction::set_loading(true));
        match request.await {
            Ok(cart) => {
                self.dispatch(CartAction::set_cart(Some(cart)));
                Ok(())
            }
            Err(e) => {
                self.dispatch(CartAction::set_error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Show `action` right away, then commit the server cart or roll back.
    ///
    /// A rollback restores the snapshot taken here, discarding any state
    /// written by mutations that finished in between.
    async fn run_optimistic<F>(
        &self,
        label: &'static str,
        action: CartAction,
        request: F,
    ) -> ClientResult<()>
    where
        F: Future<Output = ClientResult<Cart>>,
    {
        let mutation = {
            let mut state = self.state.write();
            let mutation = OptimisticMutation::prepare(&state, label, action);
            *state = mutation.optimistic_state().clone();
            mutation
        };
        trace!(label, action = mutation.action().name(), "Optimistic update applied");

        match request.await {
            Ok(cart) => {
                for action in mutation.commit(cart) {
                    self.dispatch(action);
                }
                Ok(())
            }
            Err(e) => {
                warn!(label, error = %e, "Cart request failed, rolling back");
                for action in mutation.rollback(&e) {
                    self.dispatch(action);
                }
                Err(e)
            }
        }
    }
}
