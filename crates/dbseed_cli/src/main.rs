//! # dbseed — database bring-up
//!
//! Applies a bootstrap plan to a MongoDB deployment: ensures users with their
//! grants, and ensures collections exist. Safe to run on every environment
//! start; a second run only reports updates and existing collections.
//!
//! ## Startup Sequence
//!
//! 1. Load the plan (`--plan`, or the built-in product-service plan).
//! 2. Connect (`--mongo-uri`, else `MONGODB_URI`, else `mongodb://localhost:27017`).
//! 3. Run every step in order, printing one status line per step.
//!
//! Any error exits non-zero; remaining steps are not attempted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dbseed_model::{ConflictPolicy, Plan};
use dbseed_runner::{BootstrapRunner, RunMode, RunSummary, RunnerConfig};
use dbseed_store::DocumentStore;

#[derive(Parser)]
#[command(
    name = "dbseed",
    about = "Idempotently ensure MongoDB users and collections"
)]
struct Args {
    /// Path to a JSON plan file (defaults to the built-in product-service plan)
    #[arg(short, long)]
    plan: Option<PathBuf>,

    /// MongoDB connection string (defaults to MONGODB_URI, then localhost)
    #[arg(short, long)]
    mongo_uri: Option<String>,

    /// Check every step and report what would change, without writing
    #[arg(long)]
    dry_run: bool,

    /// Abort when a target appears between its check and its creation
    #[arg(long)]
    strict_conflicts: bool,

    /// How long to wait for a reachable server, in milliseconds
    #[arg(long, default_value_t = 5000)]
    server_selection_timeout_ms: u64,

    /// Print the run summary as JSON instead of status lines
    #[arg(long)]
    json: bool,
}

impl Args {
    fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new()
            .with_mode(if self.dry_run {
                RunMode::DryRun
            } else {
                RunMode::Apply
            })
            .with_conflict_policy(if self.strict_conflicts {
                ConflictPolicy::Fatal
            } else {
                ConflictPolicy::TreatAsExisting
            })
            .with_server_selection_timeout(Duration::from_millis(self.server_selection_timeout_ms));
        if let Some(uri) = &self.mongo_uri {
            config = config.with_mongo_uri(uri);
        }
        config
    }

    fn load_plan(&self) -> Result<Plan> {
        match &self.plan {
            Some(path) => {
                info!(file = %path.display(), "loading plan");
                Plan::load(path).with_context(|| format!("loading plan {}", path.display()))
            }
            None => {
                info!("using built-in product-service plan");
                Plan::product_service().context("building the product-service plan")
            }
        }
    }

    /// Run `plan` against `store`, printing status lines unless `--json`.
    async fn apply<S>(&self, runner: &BootstrapRunner, store: &S, plan: &Plan) -> Result<RunSummary>
    where
        S: DocumentStore + ?Sized,
    {
        let json = self.json;
        runner
            .run(store, plan, |report| {
                if !json {
                    println!("{report}");
                }
            })
            .await
            .context("bootstrap aborted")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries status lines or JSON.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("dbseed=info".parse()?))
        .init();

    let args = Args::parse();
    let plan = args.load_plan()?;

    let runner = BootstrapRunner::new(args.runner_config());
    let store = runner.connect().await.context("configuring MongoDB client")?;

    let summary = args.apply(&runner, &store, &plan).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
