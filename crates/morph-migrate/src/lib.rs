//! morph-migrate — turns mutaction plans into store operations.
//!
//! Three layers, leaves first:
//! - [`relation`] decides which physical index operation a relation-level
//!   change needs, given the storage strategy.
//! - [`interpreter`] compiles each mutaction kind into its execute and
//!   compensating rollback store calls.
//! - [`sequencer`] runs an ordered plan, and on the first failure walks the
//!   already-applied prefix backward.

pub mod error;
pub mod interpreter;
pub mod relation;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApplyError, ApplyResult, RollbackFailure};
pub use interpreter::MutactionInterpreter;
pub use relation::{IndexAction, RelationIndexManager};
pub use sequencer::MigrationStepSequencer;
