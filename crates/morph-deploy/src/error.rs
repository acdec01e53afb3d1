//! Error types for the deploy orchestrator.

use morph_migrate::ApplyError;
use thiserror::Error;

/// Result type alias for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Failure modes of a deploy attempt.
///
/// Remote-reported migration errors (validation, destructive-change
/// rejection) are not in this enum: they are data, carried in
/// [`DeployOutcome::Rejected`](crate::orchestrator::DeployOutcome) so the
/// caller can re-run with a force flag.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The target (stage, cluster, dotenv) could not be resolved. Fatal,
    /// raised before any remote call.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Transport or protocol failure talking to the remote service.
    #[error("remote error: {0}")]
    Remote(String),

    /// Mirroring accepted steps into the local schema store failed.
    /// `ApplyError::RollbackFailed` inside means the mirror state is
    /// indeterminate and needs manual intervention.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// The schema sources could not be read or contained nothing.
    #[error("schema error: {0}")]
    Schema(String),

    /// The service definition file could not be updated.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
