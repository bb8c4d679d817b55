//! Integration tests for Nirvana
//!
//! These tests drive full runs, from config through reconciliation and
//! commit, against the in-memory mirror target.

use async_trait::async_trait;
use nirvana::config::{validate_config_result, NirvanaConfig};
use nirvana::mirror::{InMemoryMirror, MirrorItem, Snapshot};
use nirvana::sync::{SyncProfile, SyncRunner, TaskSource};
use nirvana::task::{ExternalTask, GitHubKind, SourceKind, TaskKey, TaskSet};
use nirvana::{NirvanaError, Result};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Source returning whatever tasks the test currently holds
struct StaticSource {
    name: String,
    profile: SyncProfile,
    tasks: Arc<Mutex<Vec<ExternalTask>>>,
}

impl StaticSource {
    fn new(name: &str, profile: SyncProfile, tasks: Vec<ExternalTask>) -> Self {
        Self {
            name: name.to_string(),
            profile,
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    fn handle(&self) -> Arc<Mutex<Vec<ExternalTask>>> {
        Arc::clone(&self.tasks)
    }
}

#[async_trait]
impl TaskSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> &SyncProfile {
        &self.profile
    }

    async fn fetch_tasks(&self) -> Result<TaskSet> {
        Ok(self.tasks.lock().unwrap().iter().cloned().collect())
    }
}

/// Source that always fails to connect
struct UnreachableSource {
    profile: SyncProfile,
}

#[async_trait]
impl TaskSource for UnreachableSource {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn profile(&self) -> &SyncProfile {
        &self.profile
    }

    async fn fetch_tasks(&self) -> Result<TaskSet> {
        Err(NirvanaError::Auth("Could not authenticate".to_string()))
    }
}

fn github_task(repo: &str, number: u64, title: &str) -> ExternalTask {
    ExternalTask::new(
        TaskKey::github(repo, GitHubKind::Issue, number),
        SourceKind::QuerySearch,
        title,
        format!("https://github.com/{}/issues/{}", repo, number),
        repo,
    )
}

fn tp_story(id: u64, title: &str, project: &str) -> ExternalTask {
    ExternalTask::new(
        TaskKey::target_process(id),
        SourceKind::HierarchicalQuery,
        title,
        format!("https://acme.tpondemand.com/RestUI/Board.aspx#page=userstory/{}", id),
        project,
    )
}

fn tp_task(id: u64, story: u64, title: &str, project: &str) -> ExternalTask {
    ExternalTask::new(
        TaskKey::target_process(id),
        SourceKind::HierarchicalQuery,
        title,
        format!("https://acme.tpondemand.com/RestUI/Board.aspx#page=task/{}", id),
        project,
    )
    .with_parent(TaskKey::target_process(story))
}

fn live_items(snapshot: &Snapshot) -> Vec<&MirrorItem> {
    snapshot.items.iter().filter(|i| !i.completed).collect()
}

fn item_with_key<'a>(snapshot: &'a Snapshot, key: &TaskKey) -> &'a MirrorItem {
    snapshot
        .items
        .iter()
        .find(|i| i.key().as_ref() == Some(key))
        .unwrap()
}

mod runner_tests {
    use super::*;

    #[tokio::test]
    async fn test_both_sources_commit_separately() {
        let mirror = InMemoryMirror::new();
        let github = StaticSource::new(
            "github",
            SyncProfile::new("github").with_labels(["work"]),
            vec![github_task("acme/api", 1, "Crash on start")],
        );
        let tp = StaticSource::new(
            "targetprocess",
            SyncProfile::new("targetprocess")
                .with_labels(["work"])
                .with_parent_project("Work"),
            vec![
                tp_task(2, 1, "Design", "Shop"),
                tp_story(1, "Checkout", "Shop"),
            ],
        );

        let runner = SyncRunner::new(mirror.clone())
            .with_source(Box::new(github))
            .with_source(Box::new(tp));
        let report = runner.run().await.unwrap();

        assert_eq!(report.commits, 2);
        assert_eq!(mirror.commit_count(), 2);
        assert_eq!(report.sources[0].stats.created, 1);
        assert_eq!(report.sources[1].stats.created, 2);

        let snapshot = mirror.current();
        assert_eq!(live_items(&snapshot).len(), 3);

        // The "work" label created by the first source is reused by the second
        let work_labels = snapshot.labels.iter().filter(|l| l.name == "work").count();
        assert_eq!(work_labels, 1);

        let story = item_with_key(&snapshot, &TaskKey::target_process(1));
        let task = item_with_key(&snapshot, &TaskKey::target_process(2));
        assert_eq!(task.parent_id.as_ref(), Some(&story.id));

        let shop = snapshot.projects.iter().find(|p| p.name == "Shop").unwrap();
        let work = snapshot.projects.iter().find(|p| p.name == "Work").unwrap();
        assert_eq!(shop.parent_id.as_ref(), Some(&work.id));
        assert_eq!(story.project_id, shop.id);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let mirror = InMemoryMirror::new();
        let tp = StaticSource::new(
            "targetprocess",
            SyncProfile::new("targetprocess").with_parent_project("Work"),
            vec![tp_story(1, "Checkout", "Shop"), tp_task(2, 1, "Design", "Shop")],
        );
        let runner = SyncRunner::new(mirror.clone()).with_source(Box::new(tp));

        runner.run().await.unwrap();
        let before = mirror.current();

        let report = runner.run().await.unwrap();
        assert_eq!(report.commits, 0);
        assert_eq!(report.total_changes(), 0);
        assert_eq!(report.sources[0].stats.unchanged, 2);
        assert_eq!(mirror.current().items, before.items);
    }

    #[tokio::test]
    async fn test_retirement_and_update() {
        let mirror = InMemoryMirror::new();
        let tp = StaticSource::new(
            "targetprocess",
            SyncProfile::new("targetprocess"),
            vec![
                tp_story(1, "Checkout", "Shop"),
                tp_task(2, 1, "Design", "Shop"),
                tp_task(3, 1, "Build", "Shop"),
            ],
        );
        let tasks = tp.handle();
        let github = StaticSource::new(
            "github",
            SyncProfile::new("github"),
            vec![github_task("acme/api", 1, "Crash")],
        );
        let runner = SyncRunner::new(mirror.clone())
            .with_source(Box::new(github))
            .with_source(Box::new(tp));
        runner.run().await.unwrap();

        // Task 3 is closed upstream and the story is renamed
        {
            let mut tasks = tasks.lock().unwrap();
            tasks.retain(|t| t.key != TaskKey::target_process(3));
            tasks[0].title = "Checkout v2".to_string();
        }

        let report = runner.run().await.unwrap();
        let tp_stats = report.sources[1].stats;
        assert_eq!(tp_stats.completed, 1);
        assert_eq!(tp_stats.updated, 1);
        assert_eq!(tp_stats.unchanged, 1);
        assert_eq!(report.sources[0].stats.total_changes(), 0);

        let snapshot = mirror.current();
        assert!(item_with_key(&snapshot, &TaskKey::target_process(3)).completed);
        assert!(!item_with_key(&snapshot, &TaskKey::new("acme/api issue#1")).completed);
        assert!(item_with_key(&snapshot, &TaskKey::target_process(1))
            .content
            .ends_with(" - Checkout v2"));

        // Completed once only
        let report = runner.run().await.unwrap();
        assert_eq!(report.sources[1].stats.completed, 0);
    }

    #[tokio::test]
    async fn test_failed_source_aborts_run() {
        let mirror = InMemoryMirror::new();
        let github = StaticSource::new(
            "github",
            SyncProfile::new("github"),
            vec![github_task("acme/api", 1, "Crash")],
        );
        let runner = SyncRunner::new(mirror.clone())
            .with_source(Box::new(github))
            .with_source(Box::new(UnreachableSource {
                profile: SyncProfile::new("targetprocess"),
            }));

        let result = runner.run().await;
        assert!(matches!(result, Err(NirvanaError::Auth(_))));
        // The first source was already committed
        assert_eq!(mirror.commit_count(), 1);
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_file_to_validated_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            r#"
todoist:
  token: td
github:
  token: gh
  query: "is:open assignee:@me"
  projectMap:
    "acme/": Acme
targetProcess:
  token: tp
  url: https://acme.tpondemand.com
  query: "AssignedUser.Where(it is Me)"
"#,
        )
        .unwrap();

        let config = NirvanaConfig::load(&config_path).unwrap();
        validate_config_result(&config).unwrap();

        let sources = nirvana::sync::sources_from_config(&config).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].profile().marker_label, "github");
        assert_eq!(sources[1].profile().marker_label, "targetprocess");
    }

    #[test]
    fn test_overlapping_project_map_is_rejected() {
        let yaml = r#"
todoist:
  token: td
github:
  token: gh
  query: "is:open"
  projectMap:
    "acme/": Acme
    "acme/api": API
"#;
        let config: NirvanaConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            validate_config_result(&config),
            Err(NirvanaError::Validation(_))
        ));
    }
}
