//! Error types for plan application.

use morph_store::StoreError;
use thiserror::Error;

/// Result type alias for sequencer operations.
pub type ApplyResult<T> = Result<T, ApplyError>;

/// A rollback that did not take effect, identified by plan position.
#[derive(Debug)]
pub struct RollbackFailure {
    pub index: usize,
    pub kind: String,
    pub error: StoreError,
}

/// Failure modes of applying a mutaction plan.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A step failed and every previously applied step was rolled back.
    /// The store is back at its pre-migration state; the plan can be
    /// corrected and retried.
    #[error("step {index} ({kind}) failed, prior steps rolled back: {source}")]
    RolledBack {
        index: usize,
        kind: String,
        #[source]
        source: StoreError,
    },

    /// A step failed and at least one compensating rollback also failed.
    /// Store state is indeterminate; manual intervention required. Not
    /// retriable.
    #[error(
        "step {index} ({kind}) failed and {} rollback step(s) also failed; \
         store state is indeterminate, manual intervention required",
        failures.len()
    )]
    RollbackFailed {
        index: usize,
        kind: String,
        forward: StoreError,
        failures: Vec<RollbackFailure>,
    },
}

impl ApplyError {
    /// True when the store was restored to its pre-migration state.
    pub fn store_restored(&self) -> bool {
        matches!(self, ApplyError::RolledBack { .. })
    }
}
