//! Reconciliation of one source's tasks against the mirror
//!
//! Two passes, always in this order:
//!
//! 1. **Stale pass**: every live item carrying the source's marker label whose
//!    key is not among the fetched tasks is completed. This is the only way
//!    mirrored items are retired.
//! 2. **Upsert pass**: every task, parents first, is created when it has no
//!    live item, or has its content refreshed when it does. Labels, project
//!    and parent of an existing item are left alone.

use crate::mirror::{LabelId, MirrorSession, ProjectId};
use crate::task::{ExternalTask, TaskSet};
use crate::Result;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Per-source reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProfile {
    /// Label identifying the items this source owns
    pub marker_label: String,

    /// Labels put on every item this source creates
    pub labels: Vec<String>,

    /// Project every task project is nested under
    pub parent_project: Option<String>,
}

impl SyncProfile {
    pub fn new(marker_label: impl Into<String>) -> Self {
        Self {
            marker_label: marker_label.into(),
            labels: Vec::new(),
            parent_project: None,
        }
    }

    /// Set the static labels
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fixed parent project
    pub fn with_parent_project(mut self, name: impl Into<String>) -> Self {
        self.parent_project = Some(name.into());
        self
    }
}

/// Counts from one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub completed: usize,
    /// Tasks whose parent had no live item
    pub skipped: usize,
}

impl ReconcileStats {
    /// Total number of queued item changes
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.completed
    }
}

/// Ids resolved once per reconciliation
struct Resolved {
    marker: LabelId,
    static_labels: BTreeSet<LabelId>,
    parent_project: Option<ProjectId>,
}

/// Reconcile `tasks` into `session`, queueing the needed commands
pub fn reconcile(
    session: &mut MirrorSession,
    tasks: &TaskSet,
    profile: &SyncProfile,
) -> Result<ReconcileStats> {
    let mut stats = ReconcileStats::default();

    let marker = session.find_or_create_label(&profile.marker_label);
    let static_labels = profile
        .labels
        .iter()
        .map(|name| session.find_or_create_label(name))
        .collect();
    let parent_project = profile
        .parent_project
        .as_deref()
        .map(|name| session.find_or_create_project(name));
    let resolved = Resolved {
        marker,
        static_labels,
        parent_project,
    };

    complete_stale(session, tasks, &resolved.marker, &mut stats)?;

    for task in tasks.in_parent_order() {
        upsert(session, task, &resolved, &mut stats)?;
    }

    info!(
        marker = %profile.marker_label,
        created = stats.created,
        updated = stats.updated,
        unchanged = stats.unchanged,
        completed = stats.completed,
        skipped = stats.skipped,
        "Reconciliation complete"
    );

    Ok(stats)
}

fn complete_stale(
    session: &mut MirrorSession,
    tasks: &TaskSet,
    marker: &LabelId,
    stats: &mut ReconcileStats,
) -> Result<()> {
    let stale: Vec<_> = session
        .items()
        .iter()
        .filter(|item| !item.completed && item.has_label(marker))
        .filter(|item| match item.key() {
            Some(key) => !tasks.contains(&key),
            None => true,
        })
        .map(|item| (item.id.clone(), item.content.clone()))
        .collect();

    for (id, content) in stale {
        if session.complete_item(&id)? {
            info!(content = %content, "Completing item");
            stats.completed += 1;
        }
    }
    Ok(())
}

fn upsert(
    session: &mut MirrorSession,
    task: &ExternalTask,
    resolved: &Resolved,
    stats: &mut ReconcileStats,
) -> Result<()> {
    let project_id = session.find_or_create_project(&task.project_name);
    if let Some(ref parent) = resolved.parent_project {
        session.move_project(&project_id, parent)?;
    }

    let mut label_ids = resolved.static_labels.clone();
    label_ids.insert(resolved.marker.clone());
    for name in &task.extra_labels {
        label_ids.insert(session.find_or_create_label(name));
    }

    let content = task.mirror_content();

    if let Some(item) = session.item_for_key(&task.key) {
        let id = item.id.clone();
        if session.update_item_content(&id, content)? {
            debug!(key = %task.key, "Updating item");
            stats.updated += 1;
        } else {
            stats.unchanged += 1;
        }
        return Ok(());
    }

    let parent_id = match task.parent_key {
        Some(ref parent_key) => match session.item_for_key(parent_key) {
            Some(parent) => Some(parent.id.clone()),
            None => {
                warn!(key = %task.key, parent = %parent_key, "Parent has no live item, skipping");
                stats.skipped += 1;
                return Ok(());
            }
        },
        None => None,
    };

    info!(key = %task.key, project = %task.project_name, "Creating item");
    session.add_item(content, project_id, parent_id, label_ids)?;
    stats.created += 1;
    Ok(())
}
