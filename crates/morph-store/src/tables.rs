//! redb table definitions for the morph schema-state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized
//! records). Index keys follow the pattern `{collection}:{field}`.

use redb::TableDefinition;

/// Collection records keyed by collection name.
pub const COLLECTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

/// Index records keyed by `{collection}:{field}`.
pub const INDEXES: TableDefinition<&str, &[u8]> = TableDefinition::new("indexes");
