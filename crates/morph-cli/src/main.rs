use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "morph",
    about = "morph — schema-migration deploys",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the schema to a cluster.
    ///
    /// Resolves the target stage and cluster from morph.toml and the flags
    /// below, submits the schema, and waits for the migration to finish.
    /// A brand-new (service, stage) pair is created upstream on first
    /// deploy and its cluster mapping written back to morph.toml.
    Deploy {
        /// Project directory containing morph.toml (default: current directory)
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Stage to deploy to (default: the stage configured in morph.toml)
        #[arg(short, long)]
        stage: Option<String>,
        /// Apply the plan even when it contains destructive changes
        #[arg(short, long)]
        force: bool,
        /// Keep running and redeploy on schema changes
        #[arg(short, long)]
        watch: bool,
        /// Cluster to place a brand-new (service, stage) pair on
        #[arg(short = 'c', long)]
        new_service_cluster: Option<String>,
        /// Resolve stage and cluster through interactive prompts
        #[arg(short, long)]
        interactive: bool,
        /// Answer would-be prompts with defaults instead of asking
        #[arg(short = 'D', long)]
        default: bool,
        /// Plan only; do not apply or wait for completion
        #[arg(short = 'd', long)]
        dry_run: bool,
        /// Print the outcome as JSON
        #[arg(short, long)]
        json: bool,
        /// Load variables from this dotenv file before resolving clusters
        #[arg(short = 'e', long)]
        dotenv: Option<String>,
    },
    /// List services and stages known to the configured clusters
    Projects {
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Only query this cluster
        #[arg(short, long)]
        cluster: Option<String>,
        /// Print as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Scaffold a morph.toml and a starter schema
    Init {
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Service name (default: the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morph=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            path,
            stage,
            force,
            watch,
            new_service_cluster,
            interactive,
            default,
            dry_run,
            json,
            dotenv,
        } => {
            commands::deploy::deploy(commands::deploy::DeployArgs {
                path,
                stage,
                force,
                watch,
                new_service_cluster,
                interactive,
                use_defaults: default,
                dry_run,
                json,
                dotenv,
            })
            .await
        }
        Commands::Projects { path, cluster, json } => {
            commands::projects::projects(&path, cluster.as_deref(), json).await
        }
        Commands::Init { path, name } => commands::init::init(&path, name.as_deref()),
    }
}
