//! SchemaStore — redb-backed mirror of collection and index state.
//!
//! Every operation is idempotent at the granularity of one collection or
//! one index: creating something that exists and dropping something that
//! is absent both succeed without touching the record. This is what lets
//! a mutaction be retried or rolled back without leaving the mirror half
//! applied.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// The storage operations a mutaction interpreter may issue.
///
/// `SchemaStore` is the production implementation; tests substitute
/// recording or failure-injecting fakes.
pub trait MutationStore: Send + Sync {
    fn create_collection(&self, name: &str) -> StoreResult<()>;
    /// Dropping a collection also drops every index on it.
    fn drop_collection(&self, name: &str) -> StoreResult<()>;
    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()>;
    /// Returns the physical name of the index, `{field}_1`.
    fn create_index(&self, collection: &str, field: &str) -> StoreResult<String>;
    fn drop_index(&self, collection: &str, field: &str) -> StoreResult<()>;
    fn list_collections(&self) -> StoreResult<Vec<CollectionRecord>>;
    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexRecord>>;
}

/// Thread-safe schema-state store backed by redb.
#[derive(Clone)]
pub struct SchemaStore {
    db: Arc<Database>,
}

impl SchemaStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "schema store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory schema store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        txn.open_table(INDEXES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get_collection(&self, name: &str) -> StoreResult<Option<CollectionRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: CollectionRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Keys of all index records on a collection.
    fn index_keys_for(&self, collection: &str) -> StoreResult<Vec<String>> {
        let prefix = format!("{collection}:");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INDEXES).map_err(map_err!(Table))?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                keys.push(key.value().to_string());
            }
        }
        Ok(keys)
    }
}

impl MutationStore for SchemaStore {
    fn create_collection(&self, name: &str) -> StoreResult<()> {
        if self.get_collection(name)?.is_some() {
            debug!(%name, "collection already present");
            return Ok(());
        }
        let record = CollectionRecord {
            name: name.to_string(),
            created_at: epoch_secs(),
        };
        let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
            table
                .insert(name, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%name, "collection created");
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> StoreResult<()> {
        // Collect index keys first, then delete everything in one write txn.
        let index_keys = self.index_keys_for(name)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut collections = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
            existed = collections.remove(name).map_err(map_err!(Write))?.is_some();
            let mut indexes = txn.open_table(INDEXES).map_err(map_err!(Table))?;
            for key in &index_keys {
                indexes.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%name, existed, indexes_swept = index_keys.len(), "collection dropped");
        Ok(())
    }

    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        let record = self
            .get_collection(from)?
            .ok_or_else(|| StoreError::NotFound(format!("collection {from}")))?;

        // Indexes belong to the collection and move with it.
        let indexes = self.list_indexes(from)?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut collections = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
            collections.remove(from).map_err(map_err!(Write))?;
            let renamed = CollectionRecord {
                name: to.to_string(),
                created_at: record.created_at,
            };
            let value = serde_json::to_vec(&renamed).map_err(map_err!(Serialize))?;
            collections
                .insert(to, value.as_slice())
                .map_err(map_err!(Write))?;

            let mut index_table = txn.open_table(INDEXES).map_err(map_err!(Table))?;
            for index in &indexes {
                index_table
                    .remove(index.table_key().as_str())
                    .map_err(map_err!(Write))?;
                let moved = IndexRecord {
                    collection: to.to_string(),
                    ..index.clone()
                };
                let value = serde_json::to_vec(&moved).map_err(map_err!(Serialize))?;
                index_table
                    .insert(moved.table_key().as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%from, %to, indexes_moved = indexes.len(), "collection renamed");
        Ok(())
    }

    fn create_index(&self, collection: &str, field: &str) -> StoreResult<String> {
        let key = format!("{collection}:{field}");
        let index_name = format!("{field}_1");

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(INDEXES).map_err(map_err!(Table))?;
            let exists = table.get(key.as_str()).map_err(map_err!(Read))?.is_some();
            if !exists {
                let record = IndexRecord {
                    name: index_name.clone(),
                    collection: collection.to_string(),
                    field: field.to_string(),
                    created_at: epoch_secs(),
                };
                let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, %field, %index_name, "index ensured");
        Ok(index_name)
    }

    fn drop_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let key = format!("{collection}:{field}");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(INDEXES).map_err(map_err!(Table))?;
            existed = table.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%collection, %field, existed, "index dropped");
        Ok(())
    }

    fn list_collections(&self) -> StoreResult<Vec<CollectionRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(COLLECTIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: CollectionRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<IndexRecord>> {
        let prefix = format!("{collection}:");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(INDEXES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let record: IndexRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
