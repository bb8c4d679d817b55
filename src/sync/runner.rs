//! Sync runner
//!
//! Drives one run: pull the mirror snapshot once, then for each source in
//! order fetch, reconcile and commit. Each source's commands are committed
//! before the next source starts, so later sources see real ids.

use super::reconcile::{reconcile, ReconcileStats};
use super::sources::TaskSource;
use crate::mirror::{MirrorSession, MirrorTarget};
use crate::Result;
use tracing::{info, warn};

/// Outcome of one source within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub tasks: usize,
    pub stats: ReconcileStats,
    /// Commands queued for this source
    pub commands: usize,
    /// Commands the target accepted (zero in dry-run mode)
    pub applied: usize,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Number of commits sent to the target
    pub commits: usize,
    pub dry_run: bool,
}

impl RunReport {
    /// Total number of item changes across every source
    pub fn total_changes(&self) -> usize {
        self.sources.iter().map(|s| s.stats.total_changes()).sum()
    }
}

/// Runs every configured source against one mirror target
pub struct SyncRunner<T: MirrorTarget> {
    target: T,
    sources: Vec<Box<dyn TaskSource>>,
    dry_run: bool,
}

impl<T: MirrorTarget> SyncRunner<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            sources: Vec::new(),
            dry_run: false,
        }
    }

    /// Add a source; sources run in insertion order
    pub fn with_source(mut self, source: Box<dyn TaskSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_sources(mut self, sources: Vec<Box<dyn TaskSource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Reconcile and log commands without committing them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Execute a full run
    ///
    /// # Errors
    ///
    /// The first failing fetch, reconciliation or commit aborts the run.
    /// Commits already made for earlier sources stay in place.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        if self.sources.is_empty() {
            warn!("No sources configured");
            return Ok(report);
        }

        let snapshot = self.target.fetch_snapshot().await?;
        let mut session = MirrorSession::new(snapshot);
        match session.user_name() {
            Some(name) => info!(target_name = self.target.name(), user = %name, "Connected"),
            None => info!(target_name = self.target.name(), "Connected"),
        }

        for source in &self.sources {
            let tasks = source.fetch_tasks().await?;
            info!(source = source.name(), count = tasks.len(), "Fetched tasks");

            let stats = reconcile(&mut session, &tasks, source.profile())?;
            let commands = session.take_commands();
            let queued = commands.len();

            let applied = if commands.is_empty() {
                info!(source = source.name(), "Nothing to commit");
                0
            } else if self.dry_run {
                for command in &commands {
                    info!(source = source.name(), command = ?command, "Dry run, not sending");
                }
                0
            } else {
                let commit = self.target.commit(commands).await?;
                report.commits += 1;
                session.apply_id_mapping(&commit.temp_id_mapping);
                info!(source = source.name(), applied = commit.applied, "Committed");
                commit.applied
            };

            report.sources.push(SourceReport {
                source: source.name().to_string(),
                tasks: tasks.len(),
                stats,
                commands: queued,
                applied,
            });
        }

        Ok(report)
    }
}
