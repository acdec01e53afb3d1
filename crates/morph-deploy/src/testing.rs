//! Test doubles for the orchestrator and watch loop.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::api::{
    DeployRequest, DeployResponse, MigrationStatus, PlannedMigration, Project, RemoteApi,
    RemoteMessage,
};
use crate::error::DeployResult;

/// In-memory remote that records calls and replays canned responses.
pub struct FakeRemote {
    migration: Mutex<Option<PlannedMigration>>,
    errors: Mutex<Vec<RemoteMessage>>,
    status: Mutex<MigrationStatus>,
    projects: Mutex<Vec<Project>>,
    added: Mutex<Vec<Project>>,
    deploys: Mutex<Vec<DeployRequest>>,
    waits: Mutex<Vec<u64>>,
    /// When present, `deploy` blocks until a permit is added, so tests can
    /// hold an attempt in flight.
    gate: Option<Semaphore>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            migration: Mutex::new(None),
            errors: Mutex::new(Vec::new()),
            status: Mutex::new(MigrationStatus::Success),
            projects: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            deploys: Mutex::new(Vec::new()),
            waits: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A fake whose `deploy` blocks until [`FakeRemote::open_gate`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn set_response(&self, migration: PlannedMigration) {
        *self.migration.lock().unwrap() = Some(migration);
    }

    pub fn set_errors(&self, errors: Vec<RemoteMessage>) {
        *self.errors.lock().unwrap() = errors;
    }

    pub fn set_status(&self, status: MigrationStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        *self.projects.lock().unwrap() = projects;
    }

    pub fn deploy_requests(&self) -> Vec<DeployRequest> {
        self.deploys.lock().unwrap().clone()
    }

    pub fn deploy_calls(&self) -> usize {
        self.deploys.lock().unwrap().len()
    }

    pub fn wait_calls(&self) -> usize {
        self.waits.lock().unwrap().len()
    }

    pub fn added_projects(&self) -> Vec<Project> {
        self.added.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn deploy(&self, request: &DeployRequest) -> DeployResult<DeployResponse> {
        self.deploys.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        let errors = self.errors.lock().unwrap().clone();
        let migration = if errors.is_empty() {
            Some(self.migration.lock().unwrap().clone().unwrap_or(PlannedMigration {
                revision: 1,
                steps: vec![],
            }))
        } else {
            None
        };
        Ok(DeployResponse { migration, errors })
    }

    async fn wait_for_migration(
        &self,
        _service: &str,
        _stage: &str,
        revision: u64,
    ) -> DeployResult<MigrationStatus> {
        self.waits.lock().unwrap().push(revision);
        Ok(*self.status.lock().unwrap())
    }

    async fn list_projects(&self) -> DeployResult<Vec<Project>> {
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn add_project(&self, name: &str, stage: &str) -> DeployResult<Project> {
        let project = Project {
            name: name.to_string(),
            stage: stage.to_string(),
        };
        self.added.lock().unwrap().push(project.clone());
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }
}
