//! Mirror target data model
//!
//! Ids are opaque strings. Objects created during a run carry a temporary id
//! until the batch is committed and the target maps it to a real one.

use crate::task::TaskKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh client-side id for an object created in the current batch
            pub fn temporary() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Swap a temporary id for its real id when `mapping` knows it
            pub fn remap(&mut self, mapping: &HashMap<String, String>) {
                if let Some(real) = mapping.get(&self.0) {
                    self.0 = real.clone();
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Id of an item (task) in the mirror target
    ItemId
);
string_id!(
    /// Id of a label in the mirror target
    LabelId
);
string_id!(
    /// Id of a project in the mirror target
    ProjectId
);

/// Item in the mirror target's task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorItem {
    pub id: ItemId,
    pub content: String,
    pub project_id: ProjectId,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub label_ids: BTreeSet<LabelId>,
    #[serde(default)]
    pub completed: bool,
}

impl MirrorItem {
    /// Key embedded in the item's content, if any
    pub fn key(&self) -> Option<TaskKey> {
        TaskKey::from_content(&self.content)
    }

    pub fn has_label(&self, label: &LabelId) -> bool {
        self.label_ids.contains(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ProjectId>,
}

/// Full state of the mirror target, pulled once at the start of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<MirrorItem>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Display name of the account owner
    #[serde(default)]
    pub user_name: Option<String>,
}
