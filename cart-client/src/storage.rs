//! redb-backed local storage
//!
//! A single string-keyed table of raw bytes, the client-side analogue of
//! browser local storage. Values are written by callers as JSON.
//!
//! | Key | Value |
//! |-----|-------|
//! | `guest_cart` | `[GuestCartItem]` |
//! | `cart_migrated` | `bool` |

use redb::{Database, ReadableDatabase, StorageBackend, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key → raw bytes
const ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("local_storage");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value store
#[derive(Clone)]
pub struct LocalStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage").finish_non_exhaustive()
    }
}

impl LocalStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_backend(redb::backends::InMemoryBackend::new())
    }

    /// Create a database over a custom redb backend
    pub fn open_with_backend(backend: impl StorageBackend) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(backend)?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ITEMS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get_item(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ITEMS_TABLE)?;
        Ok(table.get(key)?.map(|value| value.value().to_vec()))
    }

    pub fn set_item(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ITEMS_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn remove_item(&self, key: &str) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(ITEMS_TABLE)?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}
