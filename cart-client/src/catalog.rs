//! Catalog lookups used to validate lines before they reach a cart

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::cart::{CatalogEntry, ItemRef};
use std::collections::HashMap;

use crate::ClientResult;
use crate::http::HttpClient;
use crate::service::CartService;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a product or service. `Ok(None)` means it does not exist.
    async fn entry(&self, item_ref: &ItemRef) -> ClientResult<Option<CatalogEntry>>;
}

#[async_trait]
impl<H: HttpClient> Catalog for CartService<H> {
    async fn entry(&self, item_ref: &ItemRef) -> ClientResult<Option<CatalogEntry>> {
        let path = format!("api/{}/{}", item_ref.catalog_collection(), item_ref.id());
        match self.http().get::<CatalogEntry>(&path).await {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Fixed in-memory catalog
#[derive(Debug, Default)]
pub struct StaticCatalog {
    entries: RwLock<HashMap<ItemRef, CatalogEntry>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item_ref: ItemRef, entry: CatalogEntry) {
        self.entries.write().insert(item_ref, entry);
    }

    pub fn remove(&self, item_ref: &ItemRef) {
        self.entries.write().remove(item_ref);
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn entry(&self, item_ref: &ItemRef) -> ClientResult<Option<CatalogEntry>> {
        Ok(self.entries.read().get(item_ref).cloned())
    }
}
