//! Remote deploy API — trait and wire types.
//!
//! The deploy service computes the schema diff and applies it; this side
//! submits the desired schema, receives the planned steps, and polls the
//! returned revision until the service reports a terminal status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use morph_core::Mutaction;

use crate::error::DeployResult;

/// A deploy submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub service: String,
    pub stage: String,
    /// Full schema text.
    pub schema: String,
    pub dry_run: bool,
    /// Apply even when the plan contains destructive changes.
    pub force: bool,
}

/// The migration planned by the remote for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMigration {
    /// Identifier used to poll for completion.
    pub revision: u64,
    /// Ordered change primitives the remote will apply.
    pub steps: Vec<Mutaction>,
}

/// A validation or destructive-change error reported by the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteMessage {
    pub description: String,
    /// Schema path the message refers to, when known.
    #[serde(default)]
    pub field: Option<String>,
}

/// Response to a deploy submission. Zero or more steps, zero or more errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub migration: Option<PlannedMigration>,
    #[serde(default)]
    pub errors: Vec<RemoteMessage>,
}

/// Migration state reported by the remote when polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Success,
    RollingBack,
    RollbackSuccess,
    RollbackFailure,
}

impl MigrationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationStatus::Success
                | MigrationStatus::RollbackSuccess
                | MigrationStatus::RollbackFailure
        )
    }

    pub fn is_success(&self) -> bool {
        *self == MigrationStatus::Success
    }
}

/// A (service, stage) pair known to a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub stage: String,
}

/// The remote deployment service.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Submit a migration plan for (service, stage).
    async fn deploy(&self, request: &DeployRequest) -> DeployResult<DeployResponse>;

    /// Block until the remote reports the revision as terminal. No
    /// client-side timeout is imposed; cancellation is process
    /// termination.
    async fn wait_for_migration(
        &self,
        service: &str,
        stage: &str,
        revision: u64,
    ) -> DeployResult<MigrationStatus>;

    /// All (service, stage) pairs on the cluster.
    async fn list_projects(&self) -> DeployResult<Vec<Project>>;

    /// Register a new (service, stage) pair.
    async fn add_project(&self, name: &str, stage: &str) -> DeployResult<Project>;
}
