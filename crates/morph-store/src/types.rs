//! Record types persisted by the morph schema-state store.

use serde::{Deserialize, Serialize};

/// A collection known to the local mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionRecord {
    pub name: String,
    /// Unix timestamp (seconds) when the collection was first recorded.
    pub created_at: u64,
}

/// A single-field index on a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexRecord {
    /// Physical index name, `{field}_1`.
    pub name: String,
    pub collection: String,
    pub field: String,
    /// Unix timestamp (seconds) when the index was created.
    pub created_at: u64,
}

impl IndexRecord {
    /// Composite table key for this record.
    pub fn table_key(&self) -> String {
        format!("{}:{}", self.collection, self.field)
    }
}
