//! `morph deploy` — submit the schema and track the migration.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use tracing::info;

use morph_core::config::ServiceConfig;
use morph_deploy::orchestrator::{ClusterPrompt, RemoteFactory, StagePrompt};
use morph_deploy::{
    change_channel, load_schema, run_watch_loop, DeployError, DeployOptions, DeployOutcome,
    HttpRemote, Orchestrator, Prompts, RemoteApi, SchemaWatcher,
};
use morph_store::SchemaStore;

/// Interval between schema-directory scans in watch mode.
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

pub struct DeployArgs {
    pub path: String,
    pub stage: Option<String>,
    pub force: bool,
    pub watch: bool,
    pub new_service_cluster: Option<String>,
    pub interactive: bool,
    pub use_defaults: bool,
    pub dry_run: bool,
    pub json: bool,
    pub dotenv: Option<String>,
}

/// Run the `morph deploy` command.
pub async fn deploy(args: DeployArgs) -> anyhow::Result<()> {
    let project_dir = Path::new(&args.path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(&args.path));

    let config_path = project_dir.join("morph.toml");
    if !config_path.is_file() {
        bail!(
            "no morph.toml found in {}. Run `morph init` to create one.",
            project_dir.display()
        );
    }
    let config = ServiceConfig::from_file(&config_path)?;

    // Variables for ${VAR} expansion in cluster endpoints: process
    // environment, overridden by the dotenv file when given. A dotenv path
    // that does not resolve is fatal before any remote call.
    let mut vars: HashMap<String, String> = std::env::vars().collect();
    if let Some(dotenv) = &args.dotenv {
        let dotenv_path = project_dir.join(dotenv);
        if !dotenv_path.is_file() {
            bail!("dotenv file not found: {}", dotenv_path.display());
        }
        for (key, value) in parse_dotenv(&fs::read_to_string(&dotenv_path)?) {
            vars.insert(key, value);
        }
    }

    let schema_path = match &config.schema {
        Some(section) => project_dir.join(&section.path),
        None => project_dir.join("schema"),
    };

    let state_dir = project_dir.join(".morph");
    fs::create_dir_all(&state_dir)?;
    let store = Arc::new(SchemaStore::open(&state_dir.join("state.redb"))?);

    let opts = DeployOptions {
        stage: args.stage,
        new_service_cluster: args.new_service_cluster,
        dry_run: args.dry_run,
        force: args.force,
        interactive: args.interactive,
        use_defaults: args.use_defaults,
    };

    let factory: RemoteFactory =
        Box::new(|cluster| Arc::new(HttpRemote::new(&cluster.endpoint)) as Arc<dyn RemoteApi>);
    let mut orchestrator = Orchestrator::new(config, store, factory)
        .with_config_path(config_path)
        .with_env(vars)
        .with_prompts(Prompts {
            stage: Some(stage_prompt()),
            cluster: Some(cluster_prompt()),
        });

    let schema = load_schema(&schema_path)?;
    let outcome = orchestrator.deploy_once(&opts, &schema).await?;
    let lines = report(&outcome, args.json)?;
    orchestrator.session_mut().note_emitted(lines);

    if args.watch {
        let guard = orchestrator.session().guard().clone();
        let (notifier, listener) = change_channel(guard);
        let watcher = SchemaWatcher::new(schema_path.clone(), WATCH_INTERVAL);
        let (_shutdown, _poller) = watcher.spawn(notifier);
        info!(path = %schema_path.display(), "watching for schema changes");
        run_watch_loop(orchestrator, opts, listener, move || {
            load_schema(&schema_path)
        })
        .await?;
        return Ok(());
    }

    exit_for(&outcome)
}

/// Print the outcome. Returns the number of lines emitted.
fn report(outcome: &DeployOutcome, json: bool) -> anyhow::Result<usize> {
    if json {
        let text = serde_json::to_string_pretty(outcome)?;
        println!("{text}");
        return Ok(text.lines().count());
    }

    let mut lines = Vec::new();
    match outcome {
        DeployOutcome::UpToDate => {
            lines.push("Service is already up to date.".to_string());
        }
        DeployOutcome::DryRun { steps } => {
            lines.push(format!("Planned changes (dry run), {} step(s):", steps.len()));
            for step in steps {
                lines.push(format!("  {} {}", step.kind(), step.target()));
            }
        }
        DeployOutcome::Applied {
            revision,
            report,
            status,
            endpoints,
        } => {
            lines.push(format!(
                "Applied {} change(s) as revision {revision}:",
                report.steps.len()
            ));
            for step in &report.steps {
                match &step.detail {
                    Some(detail) => lines.push(format!("  {} {} ({detail})", step.kind, step.target)),
                    None => lines.push(format!("  {} {}", step.kind, step.target)),
                }
            }
            if status.is_success() {
                lines.push(String::new());
                lines.push("Your service is available at:".to_string());
                for endpoint in endpoints {
                    lines.push(format!("  {endpoint}"));
                }
            } else {
                lines.push(format!("Migration finished with status: {status:?}"));
            }
        }
        DeployOutcome::Rejected { errors } => {
            lines.push("The remote service rejected the deploy:".to_string());
            for error in errors {
                match &error.field {
                    Some(field) => lines.push(format!("  {field}: {}", error.description)),
                    None => lines.push(format!("  {}", error.description)),
                }
            }
        }
    }

    for line in &lines {
        println!("{line}");
    }
    Ok(lines.len())
}

/// Exit code policy for a single (non-watch) attempt.
fn exit_for(outcome: &DeployOutcome) -> anyhow::Result<()> {
    match outcome {
        DeployOutcome::Rejected { .. } => {
            bail!("deploy rejected; re-run with --force to apply destructive changes")
        }
        DeployOutcome::Applied { status, .. } if !status.is_success() => {
            bail!("migration ended with status {status:?}; manual intervention may be required")
        }
        _ => Ok(()),
    }
}

fn stage_prompt() -> StagePrompt {
    Box::new(|| {
        print!("Stage to deploy to: ");
        io::stdout().flush().map_err(DeployError::Io)?;
        let mut line = String::new();
        io::stdin().read_line(&mut line).map_err(DeployError::Io)?;
        let stage = line.trim().to_string();
        if stage.is_empty() {
            return Err(DeployError::Resolution("no stage entered".to_string()));
        }
        Ok(stage)
    })
}

fn cluster_prompt() -> ClusterPrompt {
    Box::new(|options: &[String]| {
        if options.is_empty() {
            return Err(DeployError::Resolution(
                "no clusters configured in morph.toml".to_string(),
            ));
        }
        println!("Select a cluster:");
        for (i, name) in options.iter().enumerate() {
            println!("  {}) {name}", i + 1);
        }
        print!("> ");
        io::stdout().flush().map_err(DeployError::Io)?;
        let mut line = String::new();
        io::stdin().read_line(&mut line).map_err(DeployError::Io)?;
        let choice: usize = line
            .trim()
            .parse()
            .map_err(|_| DeployError::Resolution(format!("not a number: {}", line.trim())))?;
        options
            .get(choice.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| DeployError::Resolution(format!("no cluster #{choice}")))
    })
}

/// Minimal KEY=VALUE parser for dotenv files. Supports comments and
/// single/double quoted values.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_deploy::MigrationStatus;

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# cluster access\nMORPH_HOST=\"https://eu1.example.com\"\n\nTOKEN='secret'\nBROKEN_LINE\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("MORPH_HOST".to_string(), "https://eu1.example.com".to_string()),
                ("TOKEN".to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn rejected_outcome_exits_non_zero() {
        let outcome = DeployOutcome::Rejected { errors: vec![] };
        assert!(exit_for(&outcome).is_err());
    }

    #[test]
    fn failed_migration_status_exits_non_zero() {
        let outcome = DeployOutcome::Applied {
            revision: 1,
            report: Default::default(),
            status: MigrationStatus::RollbackFailure,
            endpoints: vec![],
        };
        assert!(exit_for(&outcome).is_err());
    }

    #[test]
    fn up_to_date_exits_clean() {
        assert!(exit_for(&DeployOutcome::UpToDate).is_ok());
    }
}
