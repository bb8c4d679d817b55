//! Canonical record for one external work item

use super::TaskKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which source produced a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Flat search result set (GitHub)
    QuerySearch,
    /// Stories with nested tasks and bugs (TargetProcess)
    HierarchicalQuery,
}

/// External work item normalized away from its source's native schema
///
/// Recomputed fresh on every run and discarded after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTask {
    pub key: TaskKey,
    pub source: SourceKind,
    pub title: String,
    pub url: String,
    pub project_name: String,

    /// Key of the owning story, for TargetProcess tasks and bugs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<TaskKey>,

    /// Label names attached in addition to the source's marker label
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub extra_labels: BTreeSet<String>,
}

impl ExternalTask {
    pub fn new(
        key: TaskKey,
        source: SourceKind,
        title: impl Into<String>,
        url: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            key,
            source,
            title: title.into(),
            url: url.into(),
            project_name: project_name.into(),
            parent_key: None,
            extra_labels: BTreeSet::new(),
        }
    }

    /// Set the parent key
    pub fn with_parent(mut self, parent_key: TaskKey) -> Self {
        self.parent_key = Some(parent_key);
        self
    }

    /// Add extra label names
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Content string for the mirrored item: `[key](url) - title`
    pub fn mirror_content(&self) -> String {
        format!("[{}]({}) - {}", self.key, self.url, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_content() {
        let task = ExternalTask::new(
            TaskKey::target_process(1),
            SourceKind::HierarchicalQuery,
            "Story",
            "u",
            "P",
        );
        assert_eq!(task.mirror_content(), "[TP#1](u) - Story");
        assert_eq!(
            TaskKey::from_content(&task.mirror_content()),
            Some(task.key.clone())
        );
    }

    #[test]
    fn test_builder() {
        let task = ExternalTask::new(
            TaskKey::target_process(2),
            SourceKind::HierarchicalQuery,
            "Task",
            "u",
            "P",
        )
        .with_parent(TaskKey::target_process(1))
        .with_labels(["work", "tp", "work"]);

        assert_eq!(task.parent_key, Some(TaskKey::target_process(1)));
        assert_eq!(task.extra_labels.len(), 2);
    }
}
