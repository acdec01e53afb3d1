//! Test doubles shared by the interpreter and sequencer tests.

use std::sync::Mutex;

use morph_store::{MutationStore, SchemaStore, StoreError, StoreResult};

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateCollection(String),
    DropCollection(String),
    RenameCollection(String, String),
    CreateIndex(String, String),
    DropIndex(String, String),
}

impl Op {
    pub fn is_index_op(&self) -> bool {
        matches!(self, Op::CreateIndex(..) | Op::DropIndex(..))
    }
}

/// Wraps an in-memory `SchemaStore`, recording every call and optionally
/// failing specific ones.
pub struct RecordingStore {
    inner: SchemaStore,
    ops: Mutex<Vec<Op>>,
    fail_on: Mutex<Vec<Op>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SchemaStore::open_in_memory().unwrap(),
            ops: Mutex::new(Vec::new()),
            fail_on: Mutex::new(Vec::new()),
        }
    }

    /// Make the given call fail with a write error when it is next issued.
    pub fn fail_on(&self, op: Op) {
        self.fail_on.lock().unwrap().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn index_ops(&self) -> Vec<Op> {
        self.ops().into_iter().filter(Op::is_index_op).collect()
    }

    pub fn inner(&self) -> &SchemaStore {
        &self.inner
    }

    fn record(&self, op: Op) -> StoreResult<()> {
        self.ops.lock().unwrap().push(op.clone());
        if self.fail_on.lock().unwrap().contains(&op) {
            return Err(StoreError::Write(format!("injected failure for {op:?}")));
        }
        Ok(())
    }
}

impl MutationStore for RecordingStore {
    fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.record(Op::CreateCollection(name.to_string()))?;
        self.inner.create_collection(name)
    }

    fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.record(Op::DropCollection(name.to_string()))?;
        self.inner.drop_collection(name)
    }

    fn rename_collection(&self, from: &str, to: &str) -> StoreResult<()> {
        self.record(Op::RenameCollection(from.to_string(), to.to_string()))?;
        self.inner.rename_collection(from, to)
    }

    fn create_index(&self, collection: &str, field: &str) -> StoreResult<String> {
        self.record(Op::CreateIndex(collection.to_string(), field.to_string()))?;
        self.inner.create_index(collection, field)
    }

    fn drop_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        self.record(Op::DropIndex(collection.to_string(), field.to_string()))?;
        self.inner.drop_index(collection, field)
    }

    fn list_collections(&self) -> StoreResult<Vec<morph_store::CollectionRecord>> {
        self.inner.list_collections()
    }

    fn list_indexes(&self, collection: &str) -> StoreResult<Vec<morph_store::IndexRecord>> {
        self.inner.list_indexes(collection)
    }
}
