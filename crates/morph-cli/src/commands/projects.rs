//! `morph projects` — list services and stages on the configured clusters.

use std::path::Path;

use anyhow::bail;

use morph_core::config::ServiceConfig;
use morph_deploy::{HttpRemote, Project, RemoteApi};

pub async fn projects(path: &str, cluster: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config_path = Path::new(path).join("morph.toml");
    if !config_path.is_file() {
        bail!("no morph.toml found in {path}");
    }
    let config = ServiceConfig::from_file(&config_path)?;

    let vars = std::env::vars().collect();
    let mut listings: Vec<(String, Vec<Project>)> = Vec::new();
    for (name, cluster_config) in &config.clusters {
        if let Some(only) = cluster {
            if name != only {
                continue;
            }
        }
        let endpoint = cluster_config.resolved_endpoint(&vars)?;
        let remote = HttpRemote::new(&endpoint);
        let projects = remote.list_projects().await?;
        listings.push((name.clone(), projects));
    }

    if listings.is_empty() {
        bail!("no matching cluster configured in morph.toml");
    }

    if json {
        let value: serde_json::Value = listings
            .iter()
            .map(|(cluster, projects)| {
                serde_json::json!({ "cluster": cluster, "projects": projects })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{:<16} {:<24} {:<12}", "CLUSTER", "SERVICE", "STAGE");
    for (cluster, projects) in &listings {
        if projects.is_empty() {
            println!("{cluster:<16} {:<24} {:<12}", "-", "-");
            continue;
        }
        for project in projects {
            println!("{cluster:<16} {:<24} {:<12}", project.name, project.stage);
        }
    }
    Ok(())
}
