//! Nirvana - mirror GitHub and TargetProcess work items into Todoist
//!
//! Main entry point for the nirvana CLI.

use clap::Parser;
use nirvana::config::{
    validate_config_result, NirvanaConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
use nirvana::integrations::TodoistClient;
use nirvana::sync::{sources_from_config, SyncRunner};
use nirvana::NirvanaError;
use std::path::PathBuf;
use std::process;

/// Nirvana - keep a Todoist account in step with GitHub and TargetProcess
#[derive(Parser, Debug)]
#[command(name = "nirvana")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Reconcile and log the commands without sending them
    #[arg(long)]
    dry_run: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = nirvana::logging::init(cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        if e.is_connectivity() {
            tracing::error!(error = %e, "Could not reach a remote system, run aborted");
        } else {
            tracing::error!(error = %e, "Run failed");
        }
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> nirvana::Result<()> {
    let config = NirvanaConfig::load_with_env(&cli.config)?;
    validate_config_result(&config)?;

    let todoist = config
        .todoist
        .as_ref()
        .ok_or_else(|| NirvanaError::Config("todoist section is required".to_string()))?;
    let target = TodoistClient::new(&todoist.url, todoist.token.clone())?;
    let sources = sources_from_config(&config)?;

    let report = SyncRunner::new(target)
        .with_sources(sources)
        .with_dry_run(cli.dry_run)
        .run()
        .await?;

    for source in &report.sources {
        tracing::info!(
            source = %source.source,
            tasks = source.tasks,
            created = source.stats.created,
            updated = source.stats.updated,
            completed = source.stats.completed,
            skipped = source.stats.skipped,
            "Source synced"
        );
    }
    tracing::info!(
        commits = report.commits,
        changes = report.total_changes(),
        dry_run = report.dry_run,
        "Sync complete"
    );

    Ok(())
}
