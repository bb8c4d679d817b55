//! Mutations queued against the mirror target
//!
//! Commands reference objects by id. Objects created earlier in the same
//! batch are referenced by their temporary id; [`Command::remap_ids`] swaps
//! those for the real ids once the target has assigned them.

use super::{ItemId, LabelId, ProjectId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddItem {
        temp_id: ItemId,
        content: String,
        project_id: ProjectId,
        parent_id: Option<ItemId>,
        /// Label names, as the target addresses labels on items by name
        labels: Vec<String>,
    },
    UpdateItem {
        id: ItemId,
        content: String,
    },
    CompleteItem {
        id: ItemId,
    },
    AddLabel {
        temp_id: LabelId,
        name: String,
    },
    AddProject {
        temp_id: ProjectId,
        name: String,
    },
    MoveProject {
        id: ProjectId,
        parent_id: ProjectId,
    },
}

impl Command {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AddItem { .. } => "add_item",
            Command::UpdateItem { .. } => "update_item",
            Command::CompleteItem { .. } => "complete_item",
            Command::AddLabel { .. } => "add_label",
            Command::AddProject { .. } => "add_project",
            Command::MoveProject { .. } => "move_project",
        }
    }

    /// Temporary id this command introduces, if it creates an object
    pub fn temp_id(&self) -> Option<&str> {
        match self {
            Command::AddItem { temp_id, .. } => Some(temp_id.as_str()),
            Command::AddLabel { temp_id, .. } => Some(temp_id.as_str()),
            Command::AddProject { temp_id, .. } => Some(temp_id.as_str()),
            _ => None,
        }
    }

    /// Replace every referenced temporary id found in `mapping` by its real id
    pub fn remap_ids(&mut self, mapping: &HashMap<String, String>) {
        match self {
            Command::AddItem {
                project_id,
                parent_id,
                ..
            } => {
                project_id.remap(mapping);
                if let Some(parent) = parent_id {
                    parent.remap(mapping);
                }
            }
            Command::UpdateItem { id, .. } | Command::CompleteItem { id } => id.remap(mapping),
            Command::MoveProject { id, parent_id } => {
                id.remap(mapping);
                parent_id.remap(mapping);
            }
            Command::AddLabel { .. } | Command::AddProject { .. } => {}
        }
    }
}

/// Outcome of committing a batch
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    /// Temporary id to real id, for every object created by the batch
    pub temp_id_mapping: HashMap<String, String>,
    /// Number of commands the target accepted
    pub applied: usize,
}
