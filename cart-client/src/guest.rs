//! Guest cart persistence
//!
//! In-memory list of guest lines mirrored to [`LocalStorage`]. Hydrated
//! once on open, flushed after every change. A change reaches the
//! in-memory list only after its write succeeded. Corrupt stored data is
//! discarded and the cart starts empty.

use chrono::Utc;
use parking_lot::RwLock;
use shared::cart::{Customizations, GuestCartItem, ItemRef, NewCartLine};
use shared::reducer::appliers::add_or_merge_guest_item;
use tracing::{debug, warn};

use crate::storage::{LocalStorage, StorageResult};

/// Storage key of the guest line list
pub const GUEST_CART_KEY: &str = "guest_cart";
/// Storage key of the "already migrated" flag
pub const MIGRATION_FLAG_KEY: &str = "cart_migrated";

#[derive(Debug)]
pub struct GuestCartStore {
    storage: LocalStorage,
    items: RwLock<Vec<GuestCartItem>>,
}

impl GuestCartStore {
    /// Open the store and hydrate it from storage
    pub fn open(storage: LocalStorage) -> Self {
        let items = hydrate(&storage);
        debug!(count = items.len(), "Guest cart hydrated");
        Self {
            storage,
            items: RwLock::new(items),
        }
    }

    /// Re-read the persisted list, dropping in-memory state
    pub fn reload(&self) {
        *self.items.write() = hydrate(&self.storage);
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn items(&self) -> Vec<GuestCartItem> {
        self.items.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Add a line by id pair. Product wins when both ids are given.
    ///
    /// Returns `None` (and changes nothing) when neither id is usable or
    /// the quantity is not positive.
    pub fn add_to_guest_cart(
        &self,
        product_id: Option<&str>,
        service_id: Option<&str>,
        quantity: i64,
        customizations: Option<Customizations>,
        notes: Option<&str>,
    ) -> StorageResult<Option<GuestCartItem>> {
        let Some(item_ref) = ItemRef::from_ids(product_id, service_id) else {
            debug!("Guest add ignored: no product or service id");
            return Ok(None);
        };
        let Some(quantity) = positive(quantity) else {
            debug!(%item_ref, quantity, "Guest add ignored: quantity not positive");
            return Ok(None);
        };

        let mut line = NewCartLine::new(item_ref, quantity);
        line.customizations = customizations.unwrap_or_default();
        line.notes = notes.map(str::to_string);
        self.add_line(&line).map(Some)
    }

    /// Add a line, merging with an existing line of the same key
    pub fn add_line(&self, line: &NewCartLine) -> StorageResult<GuestCartItem> {
        let line_id = shared::util::new_line_id();
        let now = Utc::now();
        let mut items = self.items.write();
        let mut next = items.clone();
        add_or_merge_guest_item(&mut next, &line_id, line, now);
        let added = next
            .iter()
            .find(|i| i.item_ref == line.item_ref)
            .cloned()
            .unwrap_or_else(|| GuestCartItem::new(line_id, line, now));
        self.flush(&next)?;
        *items = next;
        Ok(added)
    }

    /// Remove a line by id. Returns whether it existed.
    pub fn remove_from_guest_cart(&self, item_id: &str) -> StorageResult<bool> {
        let mut items = self.items.write();
        if !items.iter().any(|i| i.id == item_id) {
            return Ok(false);
        }
        let next: Vec<_> = items.iter().filter(|i| i.id != item_id).cloned().collect();
        self.flush(&next)?;
        *items = next;
        Ok(true)
    }

    /// Set a line's quantity; a quantity ≤ 0 removes the line
    pub fn update_guest_cart_quantity(&self, item_id: &str, quantity: i64) -> StorageResult<bool> {
        let Some(quantity) = positive(quantity) else {
            return self.remove_from_guest_cart(item_id);
        };
        let mut items = self.items.write();
        let mut next = items.clone();
        let Some(item) = next.iter_mut().find(|i| i.id == item_id) else {
            return Ok(false);
        };
        item.quantity = quantity;
        self.flush(&next)?;
        *items = next;
        Ok(true)
    }

    /// Overwrite a stored line with the same id
    pub fn replace_item(&self, item: GuestCartItem) -> StorageResult<bool> {
        let mut items = self.items.write();
        let mut next = items.clone();
        let Some(slot) = next.iter_mut().find(|i| i.id == item.id) else {
            return Ok(false);
        };
        *slot = item;
        self.flush(&next)?;
        *items = next;
        Ok(true)
    }

    /// Empty the cart and forget the migration flag
    pub fn clear_guest_cart(&self) -> StorageResult<()> {
        let mut items = self.items.write();
        self.storage.remove_item(GUEST_CART_KEY)?;
        self.storage.remove_item(MIGRATION_FLAG_KEY)?;
        items.clear();
        Ok(())
    }

    /// Σ quantity over all lines
    pub fn get_cart_items_count(&self) -> u32 {
        self.items.read().iter().map(|i| i.quantity).sum()
    }

    pub fn is_migrated(&self) -> bool {
        match self.storage.get_item(MIGRATION_FLAG_KEY) {
            Ok(Some(raw)) => serde_json::from_slice::<bool>(&raw).unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read migration flag");
                false
            }
        }
    }

    pub fn set_migrated(&self, migrated: bool) -> StorageResult<()> {
        if migrated {
            self.storage.set_item(MIGRATION_FLAG_KEY, b"true")?;
        } else {
            self.storage.remove_item(MIGRATION_FLAG_KEY)?;
        }
        Ok(())
    }

    fn flush(&self, items: &[GuestCartItem]) -> StorageResult<()> {
        let raw = serde_json::to_vec(items)?;
        self.storage.set_item(GUEST_CART_KEY, &raw)
    }
}

fn positive(quantity: i64) -> Option<u32> {
    u32::try_from(quantity).ok().filter(|q| *q > 0)
}

fn hydrate(storage: &LocalStorage) -> Vec<GuestCartItem> {
    let raw = match storage.get_item(GUEST_CART_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read guest cart, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<GuestCartItem>>(&raw) {
        Ok(items) => items.into_iter().filter(|i| i.quantity > 0).collect(),
        Err(e) => {
            warn!(error = %e, "Guest cart data is corrupted, resetting");
            if let Err(e) = storage.remove_item(GUEST_CART_KEY) {
                warn!(error = %e, "Failed to discard corrupted guest cart");
            }
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::StorageBackend;
    use redb::backends::InMemoryBackend;
    use serde_json::json;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn store() -> GuestCartStore {
        GuestCartStore::open(LocalStorage::open_in_memory().unwrap())
    }

    #[test]
    fn test_add_merges_by_natural_key() {
        let store = store();
        store.add_to_guest_cart(Some("p1"), None, 2, None, None).unwrap();
        let item = store
            .add_to_guest_cart(Some("p1"), None, 3, None, Some("ring the bell"))
            .unwrap()
            .unwrap();

        assert_eq!(item.quantity, 5);
        assert_eq!(item.notes.as_deref(), Some("ring the bell"));
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.get_cart_items_count(), 5);
    }

    #[test]
    fn test_add_without_ids_or_quantity_is_noop() {
        let store = store();
        assert!(store.add_to_guest_cart(None, None, 1, None, None).unwrap().is_none());
        assert!(store.add_to_guest_cart(Some("p1"), None, 0, None, None).unwrap().is_none());
        assert!(store.add_to_guest_cart(Some("p1"), None, -2, None, None).unwrap().is_none());
        assert!(store.is_empty());
        assert_eq!(store.storage().get_item(GUEST_CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_product_wins_over_service() {
        let store = store();
        let item = store
            .add_to_guest_cart(Some("p1"), Some("s1"), 1, None, None)
            .unwrap()
            .unwrap();
        assert_eq!(item.item_ref, ItemRef::product("p1"));
    }

    #[test]
    fn test_update_to_zero_removes() {
        let store = store();
        let item = store.add_to_guest_cart(None, Some("s1"), 1, None, None).unwrap().unwrap();
        assert!(store.update_guest_cart_quantity(&item.id, 4).unwrap());
        assert_eq!(store.get_cart_items_count(), 4);

        assert!(store.update_guest_cart_quantity(&item.id, 0).unwrap());
        assert!(store.is_empty());
        assert!(!store.update_guest_cart_quantity("missing", 2).unwrap());
    }

    #[test]
    fn test_customizations_are_shallow_merged() {
        let store = store();
        let mut first = Customizations::new();
        first.insert("colour".into(), json!("white"));
        first.insert("watts".into(), json!(9));
        store.add_to_guest_cart(Some("bulb"), None, 1, Some(first), None).unwrap();

        let mut second = Customizations::new();
        second.insert("colour".into(), json!("warm"));
        let item = store
            .add_to_guest_cart(Some("bulb"), None, 1, Some(second), None)
            .unwrap()
            .unwrap();
        assert_eq!(item.customizations["colour"], json!("warm"));
        assert_eq!(item.customizations["watts"], json!(9));
    }

    #[test]
    fn test_corrupt_data_resets_to_empty() {
        let storage = LocalStorage::open_in_memory().unwrap();
        storage.set_item(GUEST_CART_KEY, b"{not json").unwrap();

        let store = GuestCartStore::open(storage.clone());
        assert!(store.is_empty());
        assert_eq!(storage.get_item(GUEST_CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_drops_migration_flag() {
        let store = store();
        store.add_to_guest_cart(Some("p1"), None, 1, None, None).unwrap();
        store.set_migrated(true).unwrap();
        assert!(store.is_migrated());

        store.clear_guest_cart().unwrap();
        assert!(store.is_empty());
        assert!(!store.is_migrated());
        assert_eq!(store.storage().get_item(GUEST_CART_KEY).unwrap(), None);
    }

    /// In-memory redb backend whose writes can be switched off
    #[derive(Debug)]
    struct FlakyBackend {
        inner: InMemoryBackend,
        failing: Arc<AtomicBool>,
    }

    impl FlakyBackend {
        fn check(&self) -> Result<(), io::Error> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::other("disk unplugged"));
            }
            Ok(())
        }
    }

    impl StorageBackend for FlakyBackend {
        fn len(&self) -> Result<u64, io::Error> {
            self.inner.len()
        }

        fn read(&self, offset: u64, out: &mut [u8]) -> Result<(), io::Error> {
            self.inner.read(offset, out)
        }

        fn set_len(&self, len: u64) -> Result<(), io::Error> {
            self.check()?;
            self.inner.set_len(len)
        }

        fn sync_data(&self) -> Result<(), io::Error> {
            self.check()?;
            self.inner.sync_data()
        }

        fn write(&self, offset: u64, data: &[u8]) -> Result<(), io::Error> {
            self.check()?;
            self.inner.write(offset, data)
        }
    }

    fn flaky_store() -> (GuestCartStore, Arc<AtomicBool>) {
        let failing = Arc::new(AtomicBool::new(false));
        let backend = FlakyBackend {
            inner: InMemoryBackend::new(),
            failing: failing.clone(),
        };
        let store = GuestCartStore::open(LocalStorage::open_with_backend(backend).unwrap());
        (store, failing)
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let (store, failing) = flaky_store();
        let item = store.add_to_guest_cart(Some("p1"), None, 2, None, None).unwrap().unwrap();
        let before = store.items();

        failing.store(true, Ordering::SeqCst);
        assert!(store.add_to_guest_cart(Some("p1"), None, 1, None, None).is_err());
        assert!(store.add_to_guest_cart(Some("p2"), None, 1, None, None).is_err());
        assert!(store.update_guest_cart_quantity(&item.id, 7).is_err());
        assert!(store.remove_from_guest_cart(&item.id).is_err());
        assert!(store.clear_guest_cart().is_err());

        assert_eq!(store.items(), before);
        assert_eq!(store.get_cart_items_count(), 2);
    }

    #[test]
    fn test_round_trip_through_storage() {
        let storage = LocalStorage::open_in_memory().unwrap();
        let store = GuestCartStore::open(storage.clone());
        store.add_to_guest_cart(Some("p1"), None, 2, None, Some("fragile")).unwrap();
        store.add_to_guest_cart(None, Some("s1"), 1, None, None).unwrap();

        let reopened = GuestCartStore::open(storage);
        assert_eq!(reopened.items(), store.items());
    }
}
