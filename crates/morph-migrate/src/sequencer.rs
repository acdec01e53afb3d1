//! Migration step sequencer — ordered apply with compensating rollback.
//!
//! Mutactions are applied strictly in order, one at a time; rollback
//! ordering depends on that, so there is no parallel application of
//! independent mutactions. On the first failure the already-applied prefix
//! is walked backward, last-applied first.

use tracing::{debug, error, warn};

use morph_core::{MigrationReport, MigrationStep, Mutaction, StepDirection, StepStatus};
use morph_store::MutationStore;

use crate::error::{ApplyError, ApplyResult, RollbackFailure};
use crate::interpreter::MutactionInterpreter;

/// Applies ordered mutaction plans against a store.
pub struct MigrationStepSequencer<'a> {
    store: &'a dyn MutationStore,
}

impl<'a> MigrationStepSequencer<'a> {
    pub fn new(store: &'a dyn MutationStore) -> Self {
        Self { store }
    }

    /// Apply the plan in order.
    ///
    /// On full success the report carries one applied step per mutaction.
    /// On a failure at index `i`, mutactions `0..i` are rolled back in
    /// reverse order; the forward error and any rollback errors are
    /// returned tagged separately so callers can tell a restored store
    /// from an indeterminate one.
    pub fn apply(&self, mutactions: &[Mutaction]) -> ApplyResult<MigrationReport> {
        let interpreter = MutactionInterpreter::new(self.store);
        let mut steps = Vec::with_capacity(mutactions.len());

        for (i, mutaction) in mutactions.iter().enumerate() {
            match interpreter.execute(mutaction) {
                Ok(detail) => {
                    debug!(
                        index = i,
                        kind = mutaction.kind(),
                        target = %mutaction.target(),
                        "mutaction applied"
                    );
                    steps.push(MigrationStep {
                        kind: mutaction.kind().to_string(),
                        target: mutaction.target(),
                        direction: StepDirection::Execute,
                        status: StepStatus::Applied,
                        detail,
                    });
                }
                Err(forward) => {
                    warn!(
                        index = i,
                        kind = mutaction.kind(),
                        error = %forward,
                        "mutaction failed, rolling back applied steps"
                    );
                    let failures = self.unwind(&interpreter, &mutactions[..i]);
                    if failures.is_empty() {
                        return Err(ApplyError::RolledBack {
                            index: i,
                            kind: mutaction.kind().to_string(),
                            source: forward,
                        });
                    }
                    return Err(ApplyError::RollbackFailed {
                        index: i,
                        kind: mutaction.kind().to_string(),
                        forward,
                        failures,
                    });
                }
            }
        }

        Ok(MigrationReport { steps })
    }

    /// Roll back an applied prefix in reverse order, collecting failures
    /// instead of stopping at the first one.
    fn unwind(
        &self,
        interpreter: &MutactionInterpreter<'_>,
        applied: &[Mutaction],
    ) -> Vec<RollbackFailure> {
        let mut failures = Vec::new();
        for (j, mutaction) in applied.iter().enumerate().rev() {
            match interpreter.rollback(mutaction) {
                Ok(_) => {
                    debug!(index = j, kind = mutaction.kind(), "step rolled back");
                }
                Err(e) => {
                    error!(
                        index = j,
                        kind = mutaction.kind(),
                        error = %e,
                        "rollback failed, store state now indeterminate"
                    );
                    failures.push(RollbackFailure {
                        index: j,
                        kind: mutaction.kind().to_string(),
                        error: e,
                    });
                }
            }
        }
        failures
    }
}
