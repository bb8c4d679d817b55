//! Mirror target port

use super::{Command, CommitReport, Snapshot};
use crate::Result;
use async_trait::async_trait;

/// Task-list system receiving the mirrored items
#[async_trait]
pub trait MirrorTarget: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Pull the full current state (items, labels, projects)
    async fn fetch_snapshot(&self) -> Result<Snapshot>;

    /// Apply a batch of commands as one logical commit
    ///
    /// # Errors
    ///
    /// Fails if the target cannot be reached or rejects any command.
    async fn commit(&self, commands: Vec<Command>) -> Result<CommitReport>;
}
