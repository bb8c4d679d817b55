//! In-memory mirror target for tests and local experiments.

use super::{
    Command, CommitReport, ItemId, Label, LabelId, MirrorItem, MirrorTarget, Project, ProjectId,
    Snapshot,
};
use crate::{NirvanaError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory mirror target
///
/// Assigns sequential real ids on commit and records how many commits it
/// received.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMirror {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    snapshot: Snapshot,
    next_id: u64,
    commits: usize,
}

impl InMemoryState {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }

    fn label_name_to_id(&self, name: &str) -> Option<LabelId> {
        self.snapshot
            .labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.id.clone())
    }

    fn apply(&mut self, command: Command, mapping: &mut HashMap<String, String>) -> Result<()> {
        match command {
            Command::AddLabel { temp_id, name } => {
                let id = self.fresh_id();
                mapping.insert(temp_id.to_string(), id.clone());
                self.snapshot.labels.push(Label {
                    id: LabelId::new(id),
                    name,
                });
            }
            Command::AddProject { temp_id, name } => {
                let id = self.fresh_id();
                mapping.insert(temp_id.to_string(), id.clone());
                self.snapshot.projects.push(Project {
                    id: ProjectId::new(id),
                    name,
                    parent_id: None,
                });
            }
            Command::MoveProject { id, parent_id } => {
                let project = self
                    .snapshot
                    .projects
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| NirvanaError::NotFound(format!("project {}", id)))?;
                project.parent_id = Some(parent_id);
            }
            Command::AddItem {
                temp_id,
                content,
                project_id,
                parent_id,
                labels,
            } => {
                let label_ids = labels
                    .iter()
                    .map(|name| {
                        self.label_name_to_id(name)
                            .ok_or_else(|| NirvanaError::NotFound(format!("label {}", name)))
                    })
                    .collect::<Result<_>>()?;
                let id = self.fresh_id();
                mapping.insert(temp_id.to_string(), id.clone());
                self.snapshot.items.push(MirrorItem {
                    id: ItemId::new(id),
                    content,
                    project_id,
                    parent_id,
                    label_ids,
                    completed: false,
                });
            }
            Command::UpdateItem { id, content } => {
                self.item_mut(&id)?.content = content;
            }
            Command::CompleteItem { id } => {
                self.item_mut(&id)?.completed = true;
            }
        }
        Ok(())
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut MirrorItem> {
        self.snapshot
            .items
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| NirvanaError::NotFound(format!("item {}", id)))
    }
}

impl InMemoryMirror {
    /// Creates an empty in-memory target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a target seeded with existing state.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryState {
                snapshot,
                ..Default::default()
            })),
        }
    }

    /// Current state, as a later run would fetch it (completed items included)
    pub fn current(&self) -> Snapshot {
        self.read(|s| s.snapshot.clone())
    }

    /// Number of commits received so far
    pub fn commit_count(&self) -> usize {
        self.read(|s| s.commits)
    }

    fn read<T>(&self, f: impl FnOnce(&InMemoryState) -> T) -> T {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl MirrorTarget for InMemoryMirror {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = self.current();
        // A real task list only reports live items
        snapshot.items.retain(|i| !i.completed);
        Ok(snapshot)
    }

    async fn commit(&self, commands: Vec<Command>) -> Result<CommitReport> {
        let mut state = self
            .state
            .write()
            .map_err(|e| NirvanaError::Other(format!("in-memory mirror poisoned: {}", e)))?;

        let mut mapping = HashMap::new();
        let mut applied = 0;
        for mut command in commands {
            command.remap_ids(&mapping);
            state.apply(command, &mut mapping)?;
            applied += 1;
        }
        state.commits += 1;

        Ok(CommitReport {
            temp_id_mapping: mapping,
            applied,
        })
    }
}
