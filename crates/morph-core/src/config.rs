//! morph.toml service definition parser.
//!
//! The service definition names the service, its default stage, where the
//! schema sources live, the stage → cluster mapping, and the known cluster
//! endpoints. Deploying a brand-new (service, stage) pair appends a new
//! entry to `[stages]` and writes the file back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub schema: Option<SchemaSection>,
    /// Stage name → cluster name.
    #[serde(default)]
    pub stages: BTreeMap<String, String>,
    /// Cluster name → connection details.
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    pub name: String,
    /// Default stage used when no `--stage` flag is given.
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSection {
    /// A single schema file or a directory of schema files.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster's deploy API. May reference environment
    /// variables as `${VAR}`.
    pub endpoint: String,
}

impl ClusterConfig {
    /// Expand `${VAR}` references in the endpoint against the given
    /// variable map (dotenv file merged with the process environment).
    pub fn resolved_endpoint(&self, vars: &HashMap<String, String>) -> anyhow::Result<String> {
        expand_vars(&self.endpoint, vars)
    }
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Cluster name mapped for a stage, if the pair has been deployed before.
    pub fn cluster_for_stage(&self, stage: &str) -> Option<&str> {
        self.stages.get(stage).map(String::as_str)
    }

    /// Record the stage → cluster mapping for a newly created pair.
    pub fn set_cluster_for_stage(&mut self, stage: &str, cluster: &str) {
        self.stages
            .insert(stage.to_string(), cluster.to_string());
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.get(name)
    }

    /// Scaffold a minimal morph.toml for a new service.
    pub fn scaffold(name: &str, stage: &str, cluster: &str, endpoint: &str) -> Self {
        let mut stages = BTreeMap::new();
        stages.insert(stage.to_string(), cluster.to_string());
        let mut clusters = BTreeMap::new();
        clusters.insert(
            cluster.to_string(),
            ClusterConfig {
                endpoint: endpoint.to_string(),
            },
        );
        ServiceConfig {
            service: ServiceSection {
                name: name.to_string(),
                stage: Some(stage.to_string()),
            },
            schema: Some(SchemaSection {
                path: PathBuf::from("schema"),
            }),
            stages,
            clusters,
        }
    }
}

/// Expand `${VAR}` references in `input` from `vars`.
///
/// Unknown variables are an error so a missing dotenv entry surfaces before
/// any remote call is made.
fn expand_vars(input: &str, vars: &HashMap<String, String>) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("unterminated ${{ in: {input}"))?;
        let name = &after[..end];
        let value = vars
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("undefined variable ${{{name}}}"))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("morph.toml");
        fs::write(
            &path,
            r#"
[service]
name = "catalog"
stage = "dev"

[schema]
path = "schema"

[stages]
dev = "local"

[clusters.local]
endpoint = "http://localhost:4466"
"#,
        )
        .unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.service.name, "catalog");
        assert_eq!(config.service.stage.as_deref(), Some("dev"));
        assert_eq!(config.cluster_for_stage("dev"), Some("local"));
        assert_eq!(
            config.cluster("local").unwrap().endpoint,
            "http://localhost:4466"
        );
    }

    #[test]
    fn new_stage_mapping_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("morph.toml");

        let mut config = ServiceConfig::scaffold("catalog", "dev", "local", "http://localhost:4466");
        config.set_cluster_for_stage("prod", "cloud-eu");
        config.write_to(&path).unwrap();

        let reread = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(reread.cluster_for_stage("prod"), Some("cloud-eu"));
        assert_eq!(reread.cluster_for_stage("dev"), Some("local"));
    }

    #[test]
    fn endpoint_variable_expansion() {
        let cluster = ClusterConfig {
            endpoint: "${MORPH_HOST}/api".to_string(),
        };
        let mut vars = HashMap::new();
        vars.insert("MORPH_HOST".to_string(), "https://eu1.example.com".to_string());
        assert_eq!(
            cluster.resolved_endpoint(&vars).unwrap(),
            "https://eu1.example.com/api"
        );
    }

    #[test]
    fn endpoint_unknown_variable_is_an_error() {
        let cluster = ClusterConfig {
            endpoint: "${MISSING}/api".to_string(),
        };
        let err = cluster.resolved_endpoint(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("MISSING"));
    }
}
