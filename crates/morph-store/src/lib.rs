//! morph-store — embedded schema-state mirror for morph.
//!
//! Backed by [redb](https://docs.rs/redb), tracks which collections and
//! indexes exist locally so migration steps applied by the remote service
//! can be mirrored without consulting the storage engine itself.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value columns. Index
//! records use composite `{collection}:{field}` keys so dropping a
//! collection can sweep its indexes with a prefix scan, which is what makes
//! "an index dies with its collection" observable to callers.
//!
//! The `SchemaStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`); the `MutationStore` trait is the seam mutaction
//! interpreters execute against.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{MutationStore, SchemaStore};
pub use types::*;
