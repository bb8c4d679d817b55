//! Synchronization
//!
//! Sources produce [`TaskSet`](crate::task::TaskSet)s, the reconciler turns
//! each one into queued mirror commands, and the runner commits them once per
//! source.

mod reconcile;
mod runner;
mod sources;

pub use reconcile::{reconcile, ReconcileStats, SyncProfile};
pub use runner::{RunReport, SourceReport, SyncRunner};
pub use sources::{
    sources_from_config, GitHubSource, TargetProcessSource, TaskSource, UNASSIGNED_TP_PROJECT,
};
