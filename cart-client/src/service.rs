//! Cart service
//!
//! Facade over the cart API holding the cached cart and a listener
//! registry. Constructed explicitly and shared as `Arc<CartService>`;
//! every successful mutation replaces the cached cart wholesale and
//! notifies all listeners.
//!
//! ```text
//! UI ──▶ CartService ──HTTP──▶ cart API
//!            │
//!            └── cache ──notify──▶ listeners
//! ```

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use shared::cart::{
    Cart, CartValidation, CouponApplication, CouponRejection, ItemChanges, NewCartLine,
    ShippingAddress, ShippingOption,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::http::{HttpClient, NetworkHttpClient};
use crate::{ClientError, ClientResult};

/// Called with the new cached cart (`None` after a reset)
pub type CartListener = Arc<dyn Fn(Option<&Cart>) + Send + Sync>;

type Registry = DashMap<u64, CartListener>;

/// Handle of a registered listener. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}

/// Result of applying a coupon. A rejection is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponOutcome {
    Applied(Cart),
    Rejected { reason: CouponRejection },
}

/// Requests currently in progress, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    pub adding: bool,
    pub updating: bool,
    pub removing: bool,
    pub clearing: bool,
    pub applying_coupon: bool,
}

impl InFlight {
    pub fn any(&self) -> bool {
        self.adding || self.updating || self.removing || self.clearing || self.applying_coupon
    }
}

#[derive(Debug, Default)]
struct InFlightCounters {
    adding: AtomicUsize,
    updating: AtomicUsize,
    removing: AtomicUsize,
    clearing: AtomicUsize,
    applying_coupon: AtomicUsize,
}

/// Marks one request of a kind as in flight until dropped
struct FlightGuard<'a>(&'a AtomicUsize);

impl<'a> FlightGuard<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Serialize)]
struct CouponRequest<'a> {
    code: &'a str,
}

pub struct CartService<H: HttpClient = NetworkHttpClient> {
    http: H,
    cache: RwLock<Option<Cart>>,
    listeners: Arc<Registry>,
    next_listener: AtomicU64,
    in_flight: InFlightCounters,
}

impl<H: HttpClient> CartService<H> {
    pub fn new(http: H) -> Self {
        info!(session_id = %http.session_id(), "Cart service created");
        Self {
            http,
            cache: RwLock::new(None),
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(1),
            in_flight: InFlightCounters::default(),
        }
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    /// Guest session id sent with every request
    pub fn session_id(&self) -> &str {
        self.http.session_id()
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.token().is_some()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.http.set_token(token);
    }

    /// Last cart received from the server
    pub fn cached_cart(&self) -> Option<Cart> {
        self.cache.read().clone()
    }

    pub fn in_flight(&self) -> InFlight {
        let busy = |c: &AtomicUsize| c.load(Ordering::SeqCst) > 0;
        InFlight {
            adding: busy(&self.in_flight.adding),
            updating: busy(&self.in_flight.updating),
            removing: busy(&self.in_flight.removing),
            clearing: busy(&self.in_flight.clearing),
            applying_coupon: busy(&self.in_flight.applying_coupon),
        }
    }

    // ========== Pub/sub ==========

    pub fn subscribe(
        &self,
        listener: impl Fn(Option<&Cart>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, cart: Option<&Cart>) {
        // Snapshot first: a listener may unsubscribe while being called
        let listeners: Vec<CartListener> =
            self.listeners.iter().map(|e| e.value().clone()).collect();
        for listener in listeners {
            listener(cart);
        }
    }

    fn replace_cache(&self, cart: Cart) -> Cart {
        *self.cache.write() = Some(cart.clone());
        self.notify(Some(&cart));
        cart
    }

    /// Drop the cached cart (sign-out)
    pub fn reset(&self) {
        *self.cache.write() = None;
        self.notify(None);
    }

    // ========== Cart operations ==========

    fn cart_path(&self) -> &'static str {
        if self.is_authenticated() {
            "api/cart"
        } else {
            "api/cart/guest"
        }
    }

    /// Fetch the current cart (account or guest session)
    pub async fn get_cart(&self) -> ClientResult<Cart> {
        let cart: Cart = self.http.get(self.cart_path()).await?;
        debug!(cart_id = %cart.id, items = cart.items.len(), "Cart fetched");
        Ok(self.replace_cache(cart))
    }

    pub async fn add_item(&self, line: &NewCartLine) -> ClientResult<Cart> {
        if line.quantity == 0 {
            return Err(ClientError::Validation("Quantity must be at least 1".into()));
        }
        let _guard = FlightGuard::start(&self.in_flight.adding);
        let cart: Cart = self.http.post("api/cart/items", line).await?;
        debug!(item = %line.item_ref, quantity = line.quantity, "Item added");
        Ok(self.replace_cache(cart))
    }

    pub async fn update_item(&self, item_id: &str, changes: &ItemChanges) -> ClientResult<Cart> {
        if changes.is_empty() {
            return Err(ClientError::Validation("No changes given".into()));
        }
        let _guard = FlightGuard::start(&self.in_flight.updating);
        let cart: Cart = self
            .http
            .put(&format!("api/cart/items/{}", item_id), changes)
            .await?;
        Ok(self.replace_cache(cart))
    }

    pub async fn remove_item(&self, item_id: &str) -> ClientResult<Cart> {
        let _guard = FlightGuard::start(&self.in_flight.removing);
        let cart: Cart = self.http.delete(&format!("api/cart/items/{}", item_id)).await?;
        Ok(self.replace_cache(cart))
    }

    pub async fn clear_cart(&self) -> ClientResult<Cart> {
        let _guard = FlightGuard::start(&self.in_flight.clearing);
        let cart: Cart = self.http.delete("api/cart").await?;
        Ok(self.replace_cache(cart))
    }

    /// Apply a coupon code. Ineligible codes come back as `Rejected`.
    pub async fn apply_coupon(&self, code: &str) -> ClientResult<CouponOutcome> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(CouponOutcome::Rejected {
                reason: CouponRejection::NotFound,
            });
        }
        let _guard = FlightGuard::start(&self.in_flight.applying_coupon);
        let application: CouponApplication = self
            .http
            .post("api/cart/coupons", &CouponRequest { code })
            .await?;

        match application.rejection {
            Some(reason) => {
                warn!(code, %reason, "Coupon rejected");
                Ok(CouponOutcome::Rejected { reason })
            }
            None => Ok(CouponOutcome::Applied(self.replace_cache(application.cart))),
        }
    }

    pub async fn remove_coupon(&self, code: &str) -> ClientResult<Cart> {
        let _guard = FlightGuard::start(&self.in_flight.applying_coupon);
        let cart: Cart = self
            .http
            .delete(&format!("api/cart/coupons/{}", code.trim()))
            .await?;
        Ok(self.replace_cache(cart))
    }

    pub async fn update_shipping_address(&self, address: &ShippingAddress) -> ClientResult<Cart> {
        let _guard = FlightGuard::start(&self.in_flight.updating);
        let cart: Cart = self
            .http
            .put("api/cart/enhanced/shipping-address", address)
            .await?;
        Ok(self.replace_cache(cart))
    }

    pub async fn get_shipping_options(&self) -> ClientResult<Vec<ShippingOption>> {
        self.http.get("api/cart/enhanced/shipping-options").await
    }

    /// Server-side check of availability, stock and prices before checkout
    pub async fn validate_cart(&self) -> ClientResult<CartValidation> {
        self.http.post_empty("api/cart/enhanced/validate").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn service() -> CartService {
        CartService::new(NetworkHttpClient::new("http://127.0.0.1:9").unwrap())
    }

    #[test]
    fn test_subscription_detaches_on_drop() {
        let service = service();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let sub = service.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        service.reset();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(sub);
        service.reset();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.listener_count(), 0);
    }

    #[test]
    fn test_explicit_unsubscribe() {
        let service = service();
        let sub = service.subscribe(|_| {});
        assert_eq!(service.listener_count(), 1);
        sub.unsubscribe();
        assert_eq!(service.listener_count(), 0);
    }

    #[test]
    fn test_session_ids_differ_per_instance() {
        assert_ne!(service().session_id(), service().session_id());
    }

    #[tokio::test]
    async fn test_empty_coupon_is_rejected_locally() {
        let outcome = service().apply_coupon("   ").await.unwrap();
        assert_eq!(
            outcome,
            CouponOutcome::Rejected {
                reason: CouponRejection::NotFound
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_and_clears_flag() {
        let service = service();
        let line = NewCartLine::new(shared::ItemRef::product("p1"), 1);
        let err = service.add_item(&line).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert!(!service.in_flight().any());
        assert!(service.cached_cart().is_none());
    }
}
