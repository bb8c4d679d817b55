//! In-memory mirror session
//!
//! Holds the snapshot pulled at the start of a run plus the commands queued
//! since the last commit. Every read during reconciliation is served from
//! here; every mutation is applied locally and queued, so later lookups in the
//! same run see it.
//!
//! Lookups go through indexes built once from the snapshot:
//! - key -> live item, using the key parsed from the item's content
//! - label name -> label, project name -> project (exact, case-sensitive,
//!   first entry wins)

use super::{Command, ItemId, Label, LabelId, MirrorItem, Project, ProjectId, Snapshot};
use crate::task::TaskKey;
use crate::{NirvanaError, Result};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

pub struct MirrorSession {
    items: Vec<MirrorItem>,
    labels: Vec<Label>,
    projects: Vec<Project>,
    user_name: Option<String>,

    key_index: HashMap<TaskKey, usize>,
    label_index: HashMap<String, usize>,
    project_index: HashMap<String, usize>,

    pending: Vec<Command>,
}

impl MirrorSession {
    pub fn new(snapshot: Snapshot) -> Self {
        let mut session = Self {
            items: snapshot.items,
            labels: snapshot.labels,
            projects: snapshot.projects,
            user_name: snapshot.user_name,
            key_index: HashMap::new(),
            label_index: HashMap::new(),
            project_index: HashMap::new(),
            pending: Vec::new(),
        };

        for (pos, item) in session.items.iter().enumerate() {
            if item.completed {
                continue;
            }
            if let Some(key) = item.key() {
                session.key_index.entry(key).or_insert(pos);
            }
        }
        for (pos, label) in session.labels.iter().enumerate() {
            session.label_index.entry(label.name.clone()).or_insert(pos);
        }
        for (pos, project) in session.projects.iter().enumerate() {
            session.project_index.entry(project.name.clone()).or_insert(pos);
        }

        debug!(
            items = session.items.len(),
            keyed = session.key_index.len(),
            labels = session.labels.len(),
            projects = session.projects.len(),
            "Mirror session indexed"
        );

        session
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn items(&self) -> &[MirrorItem] {
        &self.items
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn item(&self, id: &ItemId) -> Option<&MirrorItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    pub fn label(&self, id: &LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| &l.id == id)
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Live (not completed) item whose content carries exactly this key
    pub fn item_for_key(&self, key: &TaskKey) -> Option<&MirrorItem> {
        self.key_index.get(key).map(|&pos| &self.items[pos])
    }

    /// Find a label by exact name, creating it when absent
    pub fn find_or_create_label(&mut self, name: &str) -> LabelId {
        if let Some(&pos) = self.label_index.get(name) {
            debug!(label = %name, "Label found");
            return self.labels[pos].id.clone();
        }

        let id = LabelId::temporary();
        info!(label = %name, "Creating label");
        self.label_index.insert(name.to_string(), self.labels.len());
        self.labels.push(Label {
            id: id.clone(),
            name: name.to_string(),
        });
        self.pending.push(Command::AddLabel {
            temp_id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Find a project by exact name, creating it when absent
    pub fn find_or_create_project(&mut self, name: &str) -> ProjectId {
        if let Some(&pos) = self.project_index.get(name) {
            debug!(project = %name, "Project found");
            return self.projects[pos].id.clone();
        }

        let id = ProjectId::temporary();
        info!(project = %name, "Creating project");
        self.project_index
            .insert(name.to_string(), self.projects.len());
        self.projects.push(Project {
            id: id.clone(),
            name: name.to_string(),
            parent_id: None,
        });
        self.pending.push(Command::AddProject {
            temp_id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Put `project` under `parent`
    ///
    /// Returns `false` without queueing anything when the project already
    /// sits under `parent` or is `parent` itself.
    pub fn move_project(&mut self, project: &ProjectId, parent: &ProjectId) -> Result<bool> {
        if project == parent {
            return Ok(false);
        }
        let entry = self
            .projects
            .iter_mut()
            .find(|p| &p.id == project)
            .ok_or_else(|| NirvanaError::NotFound(format!("project {}", project)))?;

        if entry.parent_id.as_ref() == Some(parent) {
            return Ok(false);
        }

        debug!(project = %entry.name, parent = %parent, "Moving project");
        entry.parent_id = Some(parent.clone());
        self.pending.push(Command::MoveProject {
            id: project.clone(),
            parent_id: parent.clone(),
        });
        Ok(true)
    }

    /// Create a new item
    pub fn add_item(
        &mut self,
        content: String,
        project_id: ProjectId,
        parent_id: Option<ItemId>,
        label_ids: BTreeSet<LabelId>,
    ) -> Result<ItemId> {
        let label_names = label_ids
            .iter()
            .map(|id| {
                self.label(id)
                    .map(|l| l.name.clone())
                    .ok_or_else(|| NirvanaError::NotFound(format!("label {}", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let id = ItemId::temporary();
        let pos = self.items.len();
        let item = MirrorItem {
            id: id.clone(),
            content: content.clone(),
            project_id: project_id.clone(),
            parent_id: parent_id.clone(),
            label_ids,
            completed: false,
        };
        if let Some(key) = item.key() {
            self.key_index.entry(key).or_insert(pos);
        }
        self.items.push(item);

        self.pending.push(Command::AddItem {
            temp_id: id.clone(),
            content,
            project_id,
            parent_id,
            labels: label_names,
        });
        Ok(id)
    }

    /// Overwrite an item's content
    ///
    /// Returns `false` without queueing anything when the content is unchanged.
    pub fn update_item_content(&mut self, id: &ItemId, content: String) -> Result<bool> {
        let pos = self.position(id)?;
        if self.items[pos].content == content {
            return Ok(false);
        }

        let old_key = self.items[pos].key();
        self.items[pos].content = content.clone();
        let new_key = self.items[pos].key();
        if old_key != new_key {
            if let Some(key) = old_key {
                self.reindex_key(&key);
            }
            if let Some(key) = new_key {
                self.key_index.entry(key).or_insert(pos);
            }
        }

        self.pending.push(Command::UpdateItem {
            id: id.clone(),
            content,
        });
        Ok(true)
    }

    /// Mark an item complete
    ///
    /// Returns `false` without queueing anything when it already is.
    pub fn complete_item(&mut self, id: &ItemId) -> Result<bool> {
        let pos = self.position(id)?;
        if self.items[pos].completed {
            return Ok(false);
        }

        self.items[pos].completed = true;
        if let Some(key) = self.items[pos].key() {
            self.reindex_key(&key);
        }

        self.pending.push(Command::CompleteItem { id: id.clone() });
        Ok(true)
    }

    /// Commands queued since the last [`take_commands`](Self::take_commands)
    pub fn pending_commands(&self) -> &[Command] {
        &self.pending
    }

    /// Drain the queued commands for a commit
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }

    /// Replace temporary ids with the real ids assigned by a commit
    pub fn apply_id_mapping(&mut self, mapping: &HashMap<String, String>) {
        if mapping.is_empty() {
            return;
        }

        for item in &mut self.items {
            item.id.remap(mapping);
            item.project_id.remap(mapping);
            if let Some(parent) = item.parent_id.as_mut() {
                parent.remap(mapping);
            }
            item.label_ids = std::mem::take(&mut item.label_ids)
                .into_iter()
                .map(|mut l| {
                    l.remap(mapping);
                    l
                })
                .collect();
        }
        for label in &mut self.labels {
            label.id.remap(mapping);
        }
        for project in &mut self.projects {
            project.id.remap(mapping);
            if let Some(parent) = project.parent_id.as_mut() {
                parent.remap(mapping);
            }
        }
        for command in &mut self.pending {
            command.remap_ids(mapping);
        }
    }

    fn position(&self, id: &ItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| NirvanaError::NotFound(format!("item {}", id)))
    }

    /// Point `key` at the first live item still carrying it, or drop it
    fn reindex_key(&mut self, key: &TaskKey) {
        let next = self
            .items
            .iter()
            .position(|i| !i.completed && i.key().as_ref() == Some(key));
        match next {
            Some(pos) => {
                self.key_index.insert(key.clone(), pos);
            }
            None => {
                self.key_index.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, content: &str, labels: &[&str]) -> MirrorItem {
        MirrorItem {
            id: ItemId::new(id),
            content: content.to_string(),
            project_id: ProjectId::new("inbox"),
            parent_id: None,
            label_ids: labels.iter().map(|l| LabelId::new(*l)).collect(),
            completed: false,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            items: vec![
                item("1", "[TP#10](u) - Ten", &["tp"]),
                item("2", "Buy milk", &[]),
                item("3", "[acme/api issue#4](u) - Bug", &["gh"]),
            ],
            labels: vec![
                Label {
                    id: LabelId::new("tp"),
                    name: "targetprocess".to_string(),
                },
                Label {
                    id: LabelId::new("gh"),
                    name: "github".to_string(),
                },
            ],
            projects: vec![Project {
                id: ProjectId::new("inbox"),
                name: "Inbox".to_string(),
                parent_id: None,
            }],
            user_name: Some("Ada".to_string()),
        }
    }

    #[test]
    fn test_key_lookup_is_exact() {
        let session = MirrorSession::new(snapshot());
        assert_eq!(
            session.item_for_key(&TaskKey::target_process(10)).unwrap().id,
            ItemId::new("1")
        );
        assert!(session.item_for_key(&TaskKey::target_process(1)).is_none());
        assert!(session.item_for_key(&TaskKey::new("acme/api issue#4")).is_some());
    }

    #[test]
    fn test_find_or_create_label_is_idempotent() {
        let mut session = MirrorSession::new(snapshot());

        assert_eq!(session.find_or_create_label("github"), LabelId::new("gh"));
        assert!(session.pending_commands().is_empty());

        let created = session.find_or_create_label("work");
        assert_eq!(session.find_or_create_label("work"), created);
        assert_eq!(session.pending_commands().len(), 1);
        assert_eq!(session.pending_commands()[0].kind(), "add_label");
    }

    #[test]
    fn test_name_lookup_is_case_sensitive() {
        let mut session = MirrorSession::new(snapshot());
        let id = session.find_or_create_project("inbox");
        assert_ne!(id, ProjectId::new("inbox"));
        assert_eq!(session.projects().len(), 2);
    }

    #[test]
    fn test_move_project_is_idempotent() {
        let mut session = MirrorSession::new(snapshot());
        let parent = session.find_or_create_project("Work");
        let child = session.find_or_create_project("Team");

        assert!(session.move_project(&child, &parent).unwrap());
        assert!(!session.move_project(&child, &parent).unwrap());
        assert!(!session.move_project(&parent, &parent).unwrap());
        assert_eq!(session.project(&child).unwrap().parent_id, Some(parent));
        // Two add_project, one move_project
        assert_eq!(session.pending_commands().len(), 3);
    }

    #[test]
    fn test_move_unknown_project_fails() {
        let mut session = MirrorSession::new(snapshot());
        let result = session.move_project(&ProjectId::new("nope"), &ProjectId::new("inbox"));
        assert!(matches!(result, Err(NirvanaError::NotFound(_))));
    }

    #[test]
    fn test_added_item_is_visible_to_lookups() {
        let mut session = MirrorSession::new(snapshot());
        let id = session
            .add_item(
                "[TP#1](u) - One".to_string(),
                ProjectId::new("inbox"),
                None,
                BTreeSet::from([LabelId::new("tp")]),
            )
            .unwrap();

        assert_eq!(session.item_for_key(&TaskKey::target_process(1)).unwrap().id, id);
        match &session.pending_commands()[0] {
            Command::AddItem { labels, .. } => assert_eq!(labels, &vec!["targetprocess".to_string()]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_add_item_with_unknown_label_fails() {
        let mut session = MirrorSession::new(snapshot());
        let result = session.add_item(
            "[TP#1](u) - One".to_string(),
            ProjectId::new("inbox"),
            None,
            BTreeSet::from([LabelId::new("missing")]),
        );
        assert!(result.is_err());
        assert!(session.pending_commands().is_empty());
    }

    #[test]
    fn test_update_skips_identical_content() {
        let mut session = MirrorSession::new(snapshot());
        let id = ItemId::new("1");
        assert!(!session
            .update_item_content(&id, "[TP#10](u) - Ten".to_string())
            .unwrap());
        assert!(session
            .update_item_content(&id, "[TP#10](u) - Ten renamed".to_string())
            .unwrap());
        assert_eq!(session.pending_commands().len(), 1);
    }

    #[test]
    fn test_complete_removes_from_key_index() {
        let mut session = MirrorSession::new(snapshot());
        assert!(session.complete_item(&ItemId::new("1")).unwrap());
        assert!(!session.complete_item(&ItemId::new("1")).unwrap());
        assert!(session.item_for_key(&TaskKey::target_process(10)).is_none());
        assert_eq!(session.take_commands().len(), 1);
        assert!(session.pending_commands().is_empty());
    }

    #[test]
    fn test_complete_falls_back_to_duplicate() {
        let mut snap = snapshot();
        snap.items.push(item("9", "[TP#10](u) - Ten again", &["tp"]));
        let mut session = MirrorSession::new(snap);

        session.complete_item(&ItemId::new("1")).unwrap();
        assert_eq!(
            session.item_for_key(&TaskKey::target_process(10)).unwrap().id,
            ItemId::new("9")
        );
    }

    #[test]
    fn test_apply_id_mapping() {
        let mut session = MirrorSession::new(snapshot());
        let label = session.find_or_create_label("work");
        let project = session.find_or_create_project("Work");
        let item = session
            .add_item(
                "[TP#1](u) - One".to_string(),
                project.clone(),
                None,
                BTreeSet::from([label.clone()]),
            )
            .unwrap();

        let mapping = HashMap::from([
            (label.to_string(), "L1".to_string()),
            (project.to_string(), "P1".to_string()),
            (item.to_string(), "I1".to_string()),
        ]);
        session.apply_id_mapping(&mapping);

        let stored = session.item_for_key(&TaskKey::target_process(1)).unwrap();
        assert_eq!(stored.id, ItemId::new("I1"));
        assert_eq!(stored.project_id, ProjectId::new("P1"));
        assert!(stored.has_label(&LabelId::new("L1")));
        assert_eq!(session.find_or_create_label("work"), LabelId::new("L1"));
    }
}
