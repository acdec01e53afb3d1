//! HTTP transport for the remote deploy API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{DeployRequest, DeployResponse, MigrationStatus, Project, RemoteApi};
use crate::error::{DeployError, DeployResult};

/// Interval between completion polls.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// JSON-over-HTTP client for a cluster's deploy API.
pub struct HttpRemote {
    base: String,
    http: reqwest::Client,
}

impl HttpRemote {
    pub fn new(endpoint: &str) -> Self {
        Self {
            base: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

fn remote_err(e: reqwest::Error) -> DeployError {
    DeployError::Remote(e.to_string())
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn deploy(&self, request: &DeployRequest) -> DeployResult<DeployResponse> {
        let url = format!("{}/deploy", self.base);
        debug!(%url, service = %request.service, stage = %request.stage, "submitting plan");
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?;
        response.json().await.map_err(remote_err)
    }

    async fn wait_for_migration(
        &self,
        service: &str,
        stage: &str,
        revision: u64,
    ) -> DeployResult<MigrationStatus> {
        let url = format!("{}/migrations/{service}/{stage}/{revision}", self.base);
        // The remote decides when the migration is done; poll until it says
        // so, without a client-side deadline.
        loop {
            let status: MigrationStatus = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(remote_err)?
                .error_for_status()
                .map_err(remote_err)?
                .json()
                .await
                .map_err(remote_err)?;
            if status.is_terminal() {
                return Ok(status);
            }
            debug!(%url, ?status, "migration still running");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn list_projects(&self) -> DeployResult<Vec<Project>> {
        let url = format!("{}/projects", self.base);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)
    }

    async fn add_project(&self, name: &str, stage: &str) -> DeployResult<Project> {
        let url = format!("{}/projects", self.base);
        let body = Project {
            name: name.to_string(),
            stage: stage.to_string(),
        };
        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(remote_err)?
            .error_for_status()
            .map_err(remote_err)?
            .json()
            .await
            .map_err(remote_err)
    }
}
