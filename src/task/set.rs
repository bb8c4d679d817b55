//! Insertion-ordered collection of external tasks keyed by [`TaskKey`]

use super::{ExternalTask, TaskKey};
use std::collections::{HashMap, HashSet};

/// Tasks for one source, in the order the adapter produced them
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<ExternalTask>,
    index: HashMap<TaskKey, usize>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task, replacing any task with the same key in place
    ///
    /// Returns the replaced task, if any.
    pub fn insert(&mut self, task: ExternalTask) -> Option<ExternalTask> {
        match self.index.get(&task.key) {
            Some(&pos) => Some(std::mem::replace(&mut self.tasks[pos], task)),
            None => {
                self.index.insert(task.key.clone(), self.tasks.len());
                self.tasks.push(task);
                None
            }
        }
    }

    pub fn get(&self, key: &TaskKey) -> Option<&ExternalTask> {
        self.index.get(key).map(|&pos| &self.tasks[pos])
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ExternalTask> {
        self.tasks.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.tasks.iter().map(|t| &t.key)
    }

    /// Order tasks so every parent in this set precedes its children
    ///
    /// Tasks without a parent in the set come first, in insertion order. Each
    /// following round emits the tasks whose parent was already emitted.
    /// Tasks left over from a parent cycle are appended at the end.
    pub fn in_parent_order(&self) -> Vec<&ExternalTask> {
        let mut ordered = Vec::with_capacity(self.tasks.len());
        let mut emitted: HashSet<&TaskKey> = HashSet::with_capacity(self.tasks.len());
        let mut pending: Vec<&ExternalTask> = self.tasks.iter().collect();

        loop {
            let before = pending.len();
            let mut deferred = Vec::new();
            for task in pending {
                let ready = match &task.parent_key {
                    Some(parent) => !self.contains(parent) || emitted.contains(parent),
                    None => true,
                };
                if ready {
                    emitted.insert(&task.key);
                    ordered.push(task);
                } else {
                    deferred.push(task);
                }
            }
            pending = deferred;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        ordered.extend(pending);
        ordered
    }
}

impl FromIterator<ExternalTask> for TaskSet {
    fn from_iter<I: IntoIterator<Item = ExternalTask>>(iter: I) -> Self {
        let mut set = TaskSet::new();
        for task in iter {
            set.insert(task);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TaskSet {
    type Item = &'a ExternalTask;
    type IntoIter = std::slice::Iter<'a, ExternalTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
