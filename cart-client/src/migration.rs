//! Guest → account cart migration
//!
//! ```text
//! Idle ─▶ ValidatingItems ─▶ Merging ─┬─▶ Success        (all lines moved)
//!                │                    ├─▶ PartialSuccess (some lines moved)
//!                │                    └─▶ Failure        (nothing moved)
//!                └── account cart fetch failed ─▶ Failure
//! ```
//!
//! Lines are checked and written one by one; a bad line is reported and
//! skipped, it never aborts the batch. Once at least one line has moved,
//! the guest cart is cleared and the migrated flag set, even if other
//! lines failed.

use serde::Serialize;
use shared::cart::{CartLine, GuestCartItem, ItemChanges, NewCartLine};
use shared::reducer::MigrationStatus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::CartBackend;
use crate::catalog::Catalog;
use crate::guest::GuestCartStore;

/// Reported when the account cart cannot be read at all
pub const MIGRATION_FAILED_MESSAGE: &str = "Failed to migrate your cart. Please try again.";

/// Outcome of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub success: bool,
    /// One readable message per line that did not move
    pub errors: Vec<String>,
    pub migrated: usize,
}

impl MigrationReport {
    fn noop() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn status(&self) -> MigrationStatus {
        match (self.migrated, self.errors.is_empty()) {
            (_, true) => MigrationStatus::Success,
            (0, false) => MigrationStatus::Failure,
            (_, false) => MigrationStatus::PartialSuccess,
        }
    }
}

pub struct Migrator {
    guest: Arc<GuestCartStore>,
    target: Arc<dyn CartBackend>,
    catalog: Arc<dyn Catalog>,
}

impl Migrator {
    pub fn new(
        guest: Arc<GuestCartStore>,
        target: Arc<dyn CartBackend>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            guest,
            target,
            catalog,
        }
    }

    /// Move guest lines into the account cart.
    ///
    /// `on_status` sees every state machine transition.
    pub async fn migrate_to_user_cart(
        &self,
        is_authenticated: bool,
        on_status: &(dyn Fn(MigrationStatus) + Send + Sync),
    ) -> MigrationReport {
        let guest_items = self.guest.items();
        if !is_authenticated || guest_items.is_empty() || self.guest.is_migrated() {
            return MigrationReport::noop();
        }

        on_status(MigrationStatus::ValidatingItems);
        let server_lines = match self.target.lines().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "Cart migration aborted: account cart unavailable");
                on_status(MigrationStatus::Failure);
                return MigrationReport {
                    success: false,
                    errors: vec![MIGRATION_FAILED_MESSAGE.to_string()],
                    migrated: 0,
                };
            }
        };

        let mut report = MigrationReport::default();
        let mut valid = Vec::with_capacity(guest_items.len());
        for item in &guest_items {
            let on_server = server_lines
                .iter()
                .find(|l| l.item_ref == item.item_ref)
                .map(|l| l.quantity)
                .unwrap_or(0);
            match self.check(item, on_server).await {
                Ok(()) => valid.push(item),
                Err(message) => report.errors.push(message),
            }
        }

        on_status(MigrationStatus::Merging);
        let mut by_key: HashMap<_, CartLine> = server_lines
            .into_iter()
            .map(|l| (l.item_ref.clone(), l))
            .collect();

        for item in valid {
            let result = match by_key.get(&item.item_ref) {
                Some(existing) => {
                    let changes = merge_changes(existing, item);
                    self.target.update(&existing.id, &changes).await
                }
                None => self.target.add(&new_line(item)).await,
            };
            match result {
                Ok(lines) => {
                    report.migrated += 1;
                    // later guest lines merge against the fresh server state
                    by_key = lines.into_iter().map(|l| (l.item_ref.clone(), l)).collect();
                }
                Err(e) => {
                    warn!(item = %item.item_ref, error = %e, "Cart line not migrated");
                    report.errors.push(format!(
                        "Could not move {} to your cart: {}",
                        item.item_ref,
                        e.user_message()
                    ));
                }
            }
        }

        if report.migrated > 0 {
            if let Err(e) = self.guest.clear_guest_cart() {
                warn!(error = %e, "Failed to clear guest cart after migration");
            }
            if let Err(e) = self.guest.set_migrated(true) {
                warn!(error = %e, "Failed to persist cart migration flag");
            }
        }

        report.success = report.errors.is_empty();
        let status = report.status();
        info!(
            migrated = report.migrated,
            failed = report.errors.len(),
            ?status,
            "Cart migration finished"
        );
        on_status(status);
        report
    }

    /// Catalog check for one guest line. `on_server` units of the same
    /// key are already in the account cart.
    async fn check(&self, item: &GuestCartItem, on_server: u32) -> Result<(), String> {
        let entry = match self.catalog.entry(&item.item_ref).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Err(format!("{} is no longer available", item.item_ref)),
            Err(e) => {
                return Err(format!(
                    "Could not check {}: {}",
                    item.item_ref,
                    e.user_message()
                ));
            }
        };
        entry
            .check_quantity(item.quantity.saturating_add(on_server))
            .map_err(|issue| format!("{} {}", entry.display_name(), issue))
    }
}

/// Quantities add up, guest options win, server notes are kept if any.
/// A parked server line comes back into the order, as on a re-add.
fn merge_changes(existing: &CartLine, guest: &GuestCartItem) -> ItemChanges {
    let mut customizations = existing.customizations.clone();
    shared::cart::merge_customizations(&mut customizations, &guest.customizations);
    ItemChanges {
        quantity: Some(existing.quantity.saturating_add(guest.quantity)),
        saved_for_later: existing.saved_for_later.then_some(false),
        notes: existing.notes.clone().or_else(|| guest.notes.clone()),
        customizations: Some(customizations),
    }
}

fn new_line(item: &GuestCartItem) -> NewCartLine {
    NewCartLine {
        item_ref: item.item_ref.clone(),
        quantity: item.quantity,
        customizations: item.customizations.clone(),
        notes: item.notes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::storage::LocalStorage;
    use crate::{ClientError, ClientResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::cart::{CatalogEntry, ItemRef};

    /// Account cart kept in memory
    #[derive(Default)]
    struct MemoryBackend {
        lines: Mutex<Vec<CartLine>>,
        fail_reads: bool,
        next_id: Mutex<u32>,
    }

    #[async_trait]
    impl CartBackend for MemoryBackend {
        async fn lines(&self) -> ClientResult<Vec<CartLine>> {
            if self.fail_reads {
                return Err(ClientError::Internal("offline".into()));
            }
            Ok(self.lines.lock().clone())
        }

        async fn add(&self, line: &NewCartLine) -> ClientResult<Vec<CartLine>> {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            let mut lines = self.lines.lock();
            lines.push(CartLine {
                id: format!("srv-{}", *next_id),
                item_ref: line.item_ref.clone(),
                quantity: line.quantity,
                customizations: line.customizations.clone(),
                notes: line.notes.clone(),
                saved_for_later: false,
            });
            Ok(lines.clone())
        }

        async fn update(
            &self,
            item_id: &str,
            changes: &ItemChanges,
        ) -> ClientResult<Vec<CartLine>> {
            let mut lines = self.lines.lock();
            let line = lines
                .iter_mut()
                .find(|l| l.id == item_id)
                .ok_or_else(|| ClientError::NotFound(item_id.to_string()))?;
            if let Some(q) = changes.quantity {
                line.quantity = q;
            }
            if let Some(c) = &changes.customizations {
                line.customizations = c.clone();
            }
            if changes.notes.is_some() {
                line.notes = changes.notes.clone();
            }
            if let Some(saved) = changes.saved_for_later {
                line.saved_for_later = saved;
            }
            Ok(lines.clone())
        }

        async fn remove(&self, item_id: &str) -> ClientResult<Vec<CartLine>> {
            let mut lines = self.lines.lock();
            lines.retain(|l| l.id != item_id);
            Ok(lines.clone())
        }

        async fn clear(&self) -> ClientResult<()> {
            self.lines.lock().clear();
            Ok(())
        }
    }

    fn entry(id: &str, stock: u32) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            name: Some(id.into()),
            is_active: true,
            stock,
            price: None,
        }
    }

    struct Fixture {
        guest: Arc<GuestCartStore>,
        backend: Arc<MemoryBackend>,
        catalog: Arc<StaticCatalog>,
    }

    impl Fixture {
        fn new(backend: MemoryBackend) -> Self {
            let catalog = StaticCatalog::new();
            catalog.insert(ItemRef::product("p1"), entry("p1", 10));
            catalog.insert(ItemRef::product("p2"), entry("p2", 10));
            Self {
                guest: Arc::new(GuestCartStore::open(LocalStorage::open_in_memory().unwrap())),
                backend: Arc::new(backend),
                catalog: Arc::new(catalog),
            }
        }

        fn migrator(&self) -> Migrator {
            Migrator::new(self.guest.clone(), self.backend.clone(), self.catalog.clone())
        }
    }

    fn record() -> (Arc<Mutex<Vec<MigrationStatus>>>, impl Fn(MigrationStatus) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |s| sink.lock().push(s))
    }

    #[tokio::test]
    async fn test_migrates_all_lines_into_empty_cart() {
        let fx = Fixture::new(MemoryBackend::default());
        fx.guest.add_to_guest_cart(Some("p1"), None, 2, None, None).unwrap();
        fx.guest.add_to_guest_cart(Some("p2"), None, 1, None, None).unwrap();

        let (seen, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;

        assert_eq!(report, MigrationReport { success: true, errors: vec![], migrated: 2 });
        assert_eq!(fx.backend.lines.lock().len(), 2);
        assert!(fx.guest.is_empty());
        assert!(fx.guest.is_migrated());
        assert_eq!(
            *seen.lock(),
            vec![
                MigrationStatus::ValidatingItems,
                MigrationStatus::Merging,
                MigrationStatus::Success
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_server_line_is_merged_not_duplicated() {
        let backend = MemoryBackend::default();
        backend.lines.lock().push(CartLine {
            id: "srv-0".into(),
            item_ref: ItemRef::product("p1"),
            quantity: 3,
            customizations: Default::default(),
            notes: Some("server note".into()),
            saved_for_later: false,
        });
        let fx = Fixture::new(backend);
        fx.guest
            .add_to_guest_cart(Some("p1"), None, 2, None, Some("guest note"))
            .unwrap();

        let (_, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;
        assert!(report.success);

        let lines = fx.backend.lines.lock().clone();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].notes.as_deref(), Some("server note"));
    }

    #[tokio::test]
    async fn test_merge_brings_parked_line_back() {
        let backend = MemoryBackend::default();
        backend.lines.lock().push(CartLine {
            id: "srv-0".into(),
            item_ref: ItemRef::product("p1"),
            quantity: 1,
            customizations: Default::default(),
            notes: None,
            saved_for_later: true,
        });
        let fx = Fixture::new(backend);
        fx.guest.add_to_guest_cart(Some("p1"), None, 3, None, None).unwrap();

        let (_, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;
        assert!(report.success);

        let lines = fx.backend.lines.lock().clone();
        assert_eq!(lines[0].quantity, 4);
        assert!(!lines[0].saved_for_later);
    }

    #[test]
    fn test_merge_leaves_active_line_flag_alone() {
        let existing = CartLine {
            id: "srv-0".into(),
            item_ref: ItemRef::product("p1"),
            quantity: 1,
            customizations: Default::default(),
            notes: None,
            saved_for_later: false,
        };
        let line = NewCartLine::new(ItemRef::product("p1"), 2);
        let guest = GuestCartItem::new("local-1".into(), &line, chrono::Utc::now());
        assert_eq!(merge_changes(&existing, &guest).saved_for_later, None);
    }

    #[tokio::test]
    async fn test_missing_product_is_reported_others_move() {
        let fx = Fixture::new(MemoryBackend::default());
        fx.guest.add_to_guest_cart(Some("p1"), None, 1, None, None).unwrap();
        fx.guest.add_to_guest_cart(Some("gone"), None, 1, None, None).unwrap();

        let (seen, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;

        assert!(!report.success);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.errors, vec!["product gone is no longer available".to_string()]);
        // partial success still clears the guest cart
        assert!(fx.guest.is_empty());
        assert_eq!(seen.lock().last(), Some(&MigrationStatus::PartialSuccess));
    }

    #[tokio::test]
    async fn test_stock_counts_server_quantity() {
        let backend = MemoryBackend::default();
        backend.lines.lock().push(CartLine {
            id: "srv-0".into(),
            item_ref: ItemRef::product("p1"),
            quantity: 9,
            customizations: Default::default(),
            notes: None,
            saved_for_later: false,
        });
        let fx = Fixture::new(backend);
        fx.guest.add_to_guest_cart(Some("p1"), None, 2, None, None).unwrap();

        let (seen, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;
        assert_eq!(report.migrated, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(!fx.guest.is_empty());
        assert!(!fx.guest.is_migrated());
        assert_eq!(seen.lock().last(), Some(&MigrationStatus::Failure));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_guest_cart() {
        let fx = Fixture::new(MemoryBackend {
            fail_reads: true,
            ..Default::default()
        });
        fx.guest.add_to_guest_cart(Some("p1"), None, 1, None, None).unwrap();

        let (_, on_status) = record();
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;
        assert_eq!(
            report,
            MigrationReport {
                success: false,
                errors: vec![MIGRATION_FAILED_MESSAGE.to_string()],
                migrated: 0
            }
        );
        assert_eq!(fx.guest.get_cart_items_count(), 1);
    }

    #[tokio::test]
    async fn test_noop_cases() {
        let fx = Fixture::new(MemoryBackend::default());
        let (seen, on_status) = record();

        let migrator = fx.migrator();

        // empty guest cart
        let report = migrator.migrate_to_user_cart(true, &on_status).await;
        assert_eq!(report, MigrationReport::noop());

        fx.guest.add_to_guest_cart(Some("p1"), None, 1, None, None).unwrap();
        // signed out
        let report = migrator.migrate_to_user_cart(false, &on_status).await;
        assert_eq!(report, MigrationReport::noop());

        // already migrated
        fx.guest.set_migrated(true).unwrap();
        let report = migrator.migrate_to_user_cart(true, &on_status).await;
        assert_eq!(report, MigrationReport::noop());

        assert!(seen.lock().is_empty());
        assert!(fx.backend.lines.lock().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_does_not_duplicate() {
        let fx = Fixture::new(MemoryBackend::default());
        fx.guest.add_to_guest_cart(Some("p1"), None, 2, None, None).unwrap();
        let (_, on_status) = record();

        fx.migrator().migrate_to_user_cart(true, &on_status).await;
        let report = fx.migrator().migrate_to_user_cart(true, &on_status).await;

        assert_eq!(report.migrated, 0);
        let lines = fx.backend.lines.lock().clone();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }
}
