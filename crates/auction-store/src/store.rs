//! ClaimStore: redb-backed coordination store.
//!
//! Supports both on-disk and in-memory backends (the latter for tests and
//! single-process simulations).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::CLAIMS;
use crate::types::StoreNode;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Key/value operations a claim-with-proof needs from a shared store.
pub trait CoordinationStore: Send + Sync {
    /// Store `node`, failing with [`StoreError::KeyExists`] if the key is taken.
    fn create(&self, node: &StoreNode) -> StoreResult<()>;

    /// Replace `old` with `new` if the stored value still equals `old.value`.
    fn compare_and_swap(&self, old: &StoreNode, new: &StoreNode) -> StoreResult<()>;

    fn get(&self, key: &str) -> StoreResult<Option<StoreNode>>;
}

/// Thread-safe coordination store backed by redb.
#[derive(Clone)]
pub struct ClaimStore {
    db: Arc<Database>,
}

impl ClaimStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "claim store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory claim store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(CLAIMS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn len(&self) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLAIMS).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl CoordinationStore for ClaimStore {
    fn create(&self, node: &StoreNode) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CLAIMS).map_err(map_err!(Table))?;
            if table.get(node.key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StoreError::KeyExists(node.key.clone()));
            }
            table
                .insert(node.key.as_str(), node.value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %node.key, "claim key created");
        Ok(())
    }

    fn compare_and_swap(&self, old: &StoreNode, new: &StoreNode) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CLAIMS).map_err(map_err!(Table))?;
            let current = table
                .get(old.key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            match current {
                None => return Err(StoreError::KeyNotFound(old.key.clone())),
                Some(value) if value != old.value => {
                    return Err(StoreError::ValueMismatch(old.key.clone()));
                }
                Some(_) => {}
            }
            if new.key != old.key {
                table.remove(old.key.as_str()).map_err(map_err!(Write))?;
            }
            table
                .insert(new.key.as_str(), new.value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(key = %new.key, "claim key swapped");
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<StoreNode>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CLAIMS).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_vec());
        Ok(value.map(|value| StoreNode::new(key, value)))
    }
}
