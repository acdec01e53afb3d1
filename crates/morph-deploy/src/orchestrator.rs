//! Deploy orchestrator — drives one deploy attempt through its phases.
//!
//! `Idle → Resolving → Submitting → Polling → {Completed | Failed} → Idle`.
//!
//! Resolution picks the stage and cluster and creates the (service, stage)
//! pair upstream when it is new. Submission sends the full schema text and
//! branches on the response: remote errors fail the attempt without
//! polling, an empty plan completes immediately, a dry run reports the
//! plan without polling, and otherwise accepted steps are mirrored into
//! the local schema store before blocking on remote completion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use morph_core::{config::ServiceConfig, schema_digest, MigrationReport, Mutaction};
use morph_migrate::MigrationStepSequencer;
use morph_store::MutationStore;

use crate::api::{DeployRequest, MigrationStatus, RemoteApi, RemoteMessage};
use crate::error::{DeployError, DeployResult};
use crate::session::DeploySession;

/// Phase of the current deploy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPhase {
    Idle,
    Resolving,
    Submitting,
    Polling { revision: u64 },
    Completed,
    Failed,
}

/// A resolved cluster: registry name plus its expanded endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRef {
    pub name: String,
    pub endpoint: String,
}

/// The fully resolved target of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub service: String,
    pub stage: String,
    pub cluster: ClusterRef,
}

/// Caller-supplied knobs for an attempt.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Explicit stage; falls back to the configured default.
    pub stage: Option<String>,
    /// Cluster to place a brand-new (service, stage) pair on.
    pub new_service_cluster: Option<String>,
    pub dry_run: bool,
    pub force: bool,
    /// Resolve stage and cluster through interactive prompts.
    pub interactive: bool,
    /// Answer would-be prompts with defaults instead of asking.
    pub use_defaults: bool,
}

/// Interactive prompt callbacks. The prompt implementations live with the
/// caller; the orchestrator only knows when one is needed.
pub type StagePrompt = Box<dyn Fn() -> DeployResult<String> + Send + Sync>;
pub type ClusterPrompt = Box<dyn Fn(&[String]) -> DeployResult<String> + Send + Sync>;

#[derive(Default)]
pub struct Prompts {
    pub stage: Option<StagePrompt>,
    pub cluster: Option<ClusterPrompt>,
}

/// Builds the transport for a resolved cluster.
pub type RemoteFactory = Box<dyn Fn(&ClusterRef) -> Arc<dyn RemoteApi> + Send + Sync>;

/// What one attempt produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeployOutcome {
    /// Zero steps, zero errors: nothing to do.
    UpToDate,
    /// Dry run: the planned steps, neither mirrored nor polled.
    DryRun { steps: Vec<Mutaction> },
    /// Steps mirrored locally and polled to a terminal status upstream.
    Applied {
        revision: u64,
        report: MigrationReport,
        status: MigrationStatus,
        endpoints: Vec<String>,
    },
    /// The remote rejected the plan. Re-running with force may apply it.
    Rejected { errors: Vec<RemoteMessage> },
}

/// Sequences deploy attempts for one service definition.
pub struct Orchestrator {
    config: ServiceConfig,
    config_path: Option<PathBuf>,
    env: HashMap<String, String>,
    remote_for: RemoteFactory,
    prompts: Prompts,
    store: Arc<dyn MutationStore>,
    session: DeploySession,
    phase: DeployPhase,
}

impl Orchestrator {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn MutationStore>,
        remote_for: RemoteFactory,
    ) -> Self {
        Self {
            config,
            config_path: None,
            env: std::env::vars().collect(),
            remote_for,
            prompts: Prompts::default(),
            store,
            session: DeploySession::new(),
            phase: DeployPhase::Idle,
        }
    }

    /// Persist stage → cluster mappings back to this file when a new
    /// (service, stage) pair is created.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Variables available for `${VAR}` expansion in cluster endpoints.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn phase(&self) -> &DeployPhase {
        &self.phase
    }

    pub fn session(&self) -> &DeploySession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DeploySession {
        &mut self.session
    }

    /// Run one deploy attempt to completion.
    ///
    /// Whatever happens, the orchestrator is back in `Idle` afterwards.
    pub async fn deploy_once(
        &mut self,
        opts: &DeployOptions,
        schema: &str,
    ) -> DeployResult<DeployOutcome> {
        self.session.record_attempt();
        let result = self.run_attempt(opts, schema).await;
        if let Err(e) = &result {
            warn!(error = %e, "deploy attempt failed");
        }
        self.phase = DeployPhase::Idle;
        result
    }

    async fn run_attempt(
        &mut self,
        opts: &DeployOptions,
        schema: &str,
    ) -> DeployResult<DeployOutcome> {
        self.phase = DeployPhase::Resolving;
        let target = self.resolve_target(opts)?;
        let remote = (self.remote_for)(&target.cluster);
        self.ensure_project(remote.as_ref(), &target).await?;

        self.phase = DeployPhase::Submitting;
        let digest = schema_digest(schema);
        info!(
            service = %target.service,
            stage = %target.stage,
            cluster = %target.cluster.name,
            digest = %&digest[..12],
            dry_run = opts.dry_run,
            "submitting migration plan"
        );
        let request = DeployRequest {
            service: target.service.clone(),
            stage: target.stage.clone(),
            schema: schema.to_string(),
            dry_run: opts.dry_run,
            force: opts.force,
        };
        let response = remote.deploy(&request).await?;

        if !response.errors.is_empty() {
            self.phase = DeployPhase::Failed;
            warn!(
                count = response.errors.len(),
                "remote rejected the migration plan"
            );
            return Ok(DeployOutcome::Rejected {
                errors: response.errors,
            });
        }

        let migration = response.migration.ok_or_else(|| {
            DeployError::Remote("response carried neither a migration nor errors".to_string())
        })?;

        if migration.steps.is_empty() {
            self.phase = DeployPhase::Completed;
            info!(service = %target.service, stage = %target.stage, "already up to date");
            return Ok(DeployOutcome::UpToDate);
        }

        if opts.dry_run {
            self.phase = DeployPhase::Completed;
            info!(steps = migration.steps.len(), "dry run, skipping completion poll");
            return Ok(DeployOutcome::DryRun {
                steps: migration.steps,
            });
        }

        // Mirror the accepted steps into the local schema store. The remote
        // stays the source of truth for ordering; this only tracks the
        // index/collection side effects.
        let report = match MigrationStepSequencer::new(self.store.as_ref()).apply(&migration.steps)
        {
            Ok(report) => report,
            Err(e) => {
                if !e.store_restored() {
                    error!(
                        error = %e,
                        "local schema mirror left indeterminate; manual intervention required"
                    );
                }
                return Err(e.into());
            }
        };

        self.phase = DeployPhase::Polling {
            revision: migration.revision,
        };
        info!(revision = migration.revision, "waiting for migration to complete");
        let status = remote
            .wait_for_migration(&target.service, &target.stage, migration.revision)
            .await?;

        let endpoints = vec![service_endpoint(&target)];
        if status.is_success() {
            self.phase = DeployPhase::Completed;
            info!(
                revision = migration.revision,
                steps = report.steps.len(),
                "migration completed"
            );
        } else {
            self.phase = DeployPhase::Failed;
            warn!(revision = migration.revision, ?status, "migration did not succeed");
        }

        Ok(DeployOutcome::Applied {
            revision: migration.revision,
            report,
            status,
            endpoints,
        })
    }

    /// Pick the stage and cluster for this attempt. Never talks to the
    /// remote.
    fn resolve_target(&self, opts: &DeployOptions) -> DeployResult<DeployTarget> {
        let stage = self.resolve_stage(opts)?;
        let cluster_name = self.resolve_cluster_name(opts, &stage)?;
        let cluster = self.config.cluster(&cluster_name).ok_or_else(|| {
            DeployError::Resolution(format!("unknown cluster '{cluster_name}'"))
        })?;
        let endpoint = cluster
            .resolved_endpoint(&self.env)
            .map_err(|e| DeployError::Resolution(e.to_string()))?;

        Ok(DeployTarget {
            service: self.config.service.name.clone(),
            stage,
            cluster: ClusterRef {
                name: cluster_name,
                endpoint,
            },
        })
    }

    fn resolve_stage(&self, opts: &DeployOptions) -> DeployResult<String> {
        if let Some(stage) = &opts.stage {
            return Ok(stage.clone());
        }
        if let Some(stage) = &self.config.service.stage {
            if !opts.interactive {
                return Ok(stage.clone());
            }
        }
        if opts.use_defaults {
            if let Some(stage) = &self.config.service.stage {
                return Ok(stage.clone());
            }
        }
        match &self.prompts.stage {
            Some(prompt) => prompt(),
            None => Err(DeployError::Resolution(
                "no stage specified and no default configured".to_string(),
            )),
        }
    }

    fn resolve_cluster_name(&self, opts: &DeployOptions, stage: &str) -> DeployResult<String> {
        if !opts.interactive {
            if let Some(name) = self.config.cluster_for_stage(stage) {
                return Ok(name.to_string());
            }
            if let Some(name) = &opts.new_service_cluster {
                return Ok(name.clone());
            }
            if opts.use_defaults {
                if let Some(name) = self.config.clusters.keys().next() {
                    return Ok(name.clone());
                }
            }
        }
        match &self.prompts.cluster {
            Some(prompt) => {
                let available: Vec<String> = self.config.clusters.keys().cloned().collect();
                prompt(&available)
            }
            None => Err(DeployError::Resolution(format!(
                "no cluster mapped for stage '{stage}'; pass --new-service-cluster"
            ))),
        }
    }

    /// Create the (service, stage) pair upstream when it is new, and
    /// persist the stage → cluster mapping. One-shot per new pair: once
    /// the mapping is in the service definition and the project exists,
    /// later attempts skip both writes.
    async fn ensure_project(
        &mut self,
        remote: &dyn RemoteApi,
        target: &DeployTarget,
    ) -> DeployResult<()> {
        let projects = remote.list_projects().await?;
        let exists = projects
            .iter()
            .any(|p| p.name == target.service && p.stage == target.stage);

        if !exists {
            info!(
                service = %target.service,
                stage = %target.stage,
                cluster = %target.cluster.name,
                "creating new service stage"
            );
            remote.add_project(&target.service, &target.stage).await?;
        }

        if self.config.cluster_for_stage(&target.stage).is_none() {
            self.config
                .set_cluster_for_stage(&target.stage, &target.cluster.name);
            if let Some(path) = &self.config_path {
                self.config
                    .write_to(path)
                    .map_err(|e| DeployError::Config(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Public access endpoint for a deployed (service, stage).
fn service_endpoint(target: &DeployTarget) -> String {
    format!(
        "{}/{}/{}",
        target.cluster.endpoint.trim_end_matches('/'),
        target.service,
        target.stage
    )
}
