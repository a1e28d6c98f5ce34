//! One interface over the two cart stores
//!
//! Guest lines live in local storage, account lines on the server. Code
//! that only needs "the lines of some cart" (the migration, the store)
//! talks to [`CartBackend`] and never checks which one it has.

use async_trait::async_trait;
use shared::cart::{CartLine, ItemChanges, NewCartLine, merge_customizations};
use std::sync::Arc;

use crate::guest::GuestCartStore;
use crate::http::HttpClient;
use crate::service::CartService;
use crate::{ClientError, ClientResult};

#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Current lines of the cart
    async fn lines(&self) -> ClientResult<Vec<CartLine>>;
    /// Add (or merge) a line, returning the updated lines
    async fn add(&self, line: &NewCartLine) -> ClientResult<Vec<CartLine>>;
    async fn update(&self, item_id: &str, changes: &ItemChanges) -> ClientResult<Vec<CartLine>>;
    async fn remove(&self, item_id: &str) -> ClientResult<Vec<CartLine>>;
    async fn clear(&self) -> ClientResult<()>;
}

fn guest_lines(store: &GuestCartStore) -> Vec<CartLine> {
    store.items().iter().map(CartLine::from).collect()
}

#[async_trait]
impl CartBackend for GuestCartStore {
    async fn lines(&self) -> ClientResult<Vec<CartLine>> {
        Ok(guest_lines(self))
    }

    async fn add(&self, line: &NewCartLine) -> ClientResult<Vec<CartLine>> {
        if line.quantity == 0 {
            return Err(ClientError::Validation("Quantity must be at least 1".into()));
        }
        self.add_line(line)?;
        Ok(guest_lines(self))
    }

    async fn update(&self, item_id: &str, changes: &ItemChanges) -> ClientResult<Vec<CartLine>> {
        if let Some(quantity) = changes.quantity {
            self.update_guest_cart_quantity(item_id, i64::from(quantity))?;
        }
        if changes.notes.is_some() || changes.customizations.is_some() {
            // Notes and options are edited in place on the stored line
            if let Some(mut item) = self.items().into_iter().find(|i| i.id == item_id) {
                if let Some(notes) = &changes.notes {
                    item.notes = Some(notes.clone()).filter(|n| !n.trim().is_empty());
                }
                if let Some(customizations) = &changes.customizations {
                    merge_customizations(&mut item.customizations, customizations);
                }
                self.replace_item(item)?;
            }
        }
        Ok(guest_lines(self))
    }

    async fn remove(&self, item_id: &str) -> ClientResult<Vec<CartLine>> {
        self.remove_from_guest_cart(item_id)?;
        Ok(guest_lines(self))
    }

    async fn clear(&self) -> ClientResult<()> {
        Ok(self.clear_guest_cart()?)
    }
}

/// Server-backed cart, through the cart service
pub struct RemoteCartBackend<H: HttpClient> {
    service: Arc<CartService<H>>,
}

impl<H: HttpClient> RemoteCartBackend<H> {
    pub fn new(service: Arc<CartService<H>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<H: HttpClient> CartBackend for RemoteCartBackend<H> {
    async fn lines(&self) -> ClientResult<Vec<CartLine>> {
        let cart = self.service.get_cart().await?;
        Ok(cart.items.iter().map(CartLine::from).collect())
    }

    async fn add(&self, line: &NewCartLine) -> ClientResult<Vec<CartLine>> {
        let cart = self.service.add_item(line).await?;
        Ok(cart.items.iter().map(CartLine::from).collect())
    }

    async fn update(&self, item_id: &str, changes: &ItemChanges) -> ClientResult<Vec<CartLine>> {
        let cart = self.service.update_item(item_id, changes).await?;
        Ok(cart.items.iter().map(CartLine::from).collect())
    }

    async fn remove(&self, item_id: &str) -> ClientResult<Vec<CartLine>> {
        let cart = self.service.remove_item(item_id).await?;
        Ok(cart.items.iter().map(CartLine::from).collect())
    }

    async fn clear(&self) -> ClientResult<()> {
        self.service.clear_cart().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use shared::ItemRef;

    #[tokio::test]
    async fn test_guest_backend_through_the_trait() {
        let store = GuestCartStore::open(LocalStorage::open_in_memory().unwrap());
        let backend: &dyn CartBackend = &store;

        backend.add(&NewCartLine::new(ItemRef::product("p1"), 2)).await.unwrap();
        let lines = backend.add(&NewCartLine::new(ItemRef::product("p1"), 1)).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);

        let id = lines[0].id.clone();
        let changes = ItemChanges {
            notes: Some("leave at door".into()),
            ..ItemChanges::quantity(5)
        };
        let lines = backend.update(&id, &changes).await.unwrap();
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].notes.as_deref(), Some("leave at door"));

        let lines = backend.update(&id, &ItemChanges::quantity(0)).await.unwrap();
        assert!(lines.is_empty());

        backend.add(&NewCartLine::new(ItemRef::service("s1"), 1)).await.unwrap();
        backend.clear().await.unwrap();
        assert!(backend.lines().await.unwrap().is_empty());
    }
}
