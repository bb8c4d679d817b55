//! Task sources
//!
//! A source fetches the current external work items and normalizes them into
//! a [`TaskSet`]. Any fetch failure is returned as-is and aborts the run.

use super::SyncProfile;
use crate::config::{GitHubSettings, NirvanaConfig, TargetProcessSettings};
use crate::integrations::{
    EntityKind, GitHubAdapter, SearchResult, TargetProcessAdapter, UserStory,
};
use crate::task::{ExternalTask, GitHubKind, SourceKind, TaskKey, TaskSet};
use crate::{NirvanaError, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Project used for TargetProcess stories that belong to no project
pub const UNASSIGNED_TP_PROJECT: &str = "TargetProcess";

/// Source of external work items
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// How this source's items are labelled and placed
    fn profile(&self) -> &SyncProfile;

    /// Fetch the full current set of tasks
    async fn fetch_tasks(&self) -> Result<TaskSet>;
}

/// GitHub issue and pull request search
pub struct GitHubSource {
    adapter: GitHubAdapter,
    settings: GitHubSettings,
    profile: SyncProfile,
}

impl GitHubSource {
    pub fn new(settings: GitHubSettings) -> Result<Self> {
        let adapter = GitHubAdapter::new(&settings.url, settings.token.clone())?;
        let profile =
            SyncProfile::new(settings.default_label.clone()).with_labels(settings.labels.clone());
        Ok(Self {
            adapter,
            settings,
            profile,
        })
    }

    /// Turn search results into tasks
    pub fn normalize(settings: &GitHubSettings, results: Vec<SearchResult>) -> Result<TaskSet> {
        results
            .into_iter()
            .map(|result| {
                let kind = if result.is_pull_request {
                    GitHubKind::PullRequest
                } else {
                    GitHubKind::Issue
                };
                let key = TaskKey::github(&result.repository_full_name, kind, result.number);
                let project = resolve_project(settings, &result.repository_full_name)?;
                let labels = resolve_labels(settings, &key);

                Ok(ExternalTask::new(
                    key,
                    SourceKind::QuerySearch,
                    result.title,
                    result.url,
                    project,
                )
                .with_labels(labels))
            })
            .collect()
    }
}

/// Project for a repository
///
/// `defaultProject` wins. Otherwise the single `projectMap` entry whose key
/// occurs in the repository name, or the repository name itself.
fn resolve_project(settings: &GitHubSettings, repository: &str) -> Result<String> {
    if let Some(ref project) = settings.default_project {
        return Ok(project.clone());
    }

    let matches: Vec<(&String, &String)> = settings
        .project_map
        .iter()
        .filter(|(key, _)| repository.contains(key.as_str()))
        .collect();

    match matches.as_slice() {
        [] => Ok(repository.to_string()),
        [(_, project)] => Ok((*project).clone()),
        _ => Err(NirvanaError::AmbiguousMapping {
            map: "github.projectMap".to_string(),
            value: repository.to_string(),
            keys: matches.iter().map(|(key, _)| (*key).clone()).collect(),
        }),
    }
}

/// Static labels plus every `labelMap` list whose key occurs in the task key
fn resolve_labels(settings: &GitHubSettings, key: &TaskKey) -> Vec<String> {
    let mut labels = settings.labels.clone();
    for (pattern, mapped) in &settings.label_map {
        if key.as_str().contains(pattern.as_str()) {
            labels.extend(mapped.iter().cloned());
        }
    }
    labels
}

#[async_trait]
impl TaskSource for GitHubSource {
    fn name(&self) -> &str {
        "github"
    }

    fn profile(&self) -> &SyncProfile {
        &self.profile
    }

    async fn fetch_tasks(&self) -> Result<TaskSet> {
        info!(query = %self.settings.query, "Getting GitHub items");
        let results = self
            .adapter
            .search_all(&self.settings.query, self.settings.limit)
            .await?;
        let tasks = Self::normalize(&self.settings, results)?;
        debug!(count = tasks.len(), "Normalized GitHub items");
        Ok(tasks)
    }
}

/// TargetProcess user stories with their open tasks and bugs
pub struct TargetProcessSource {
    adapter: TargetProcessAdapter,
    settings: TargetProcessSettings,
    profile: SyncProfile,
}

impl TargetProcessSource {
    pub fn new(settings: TargetProcessSettings) -> Result<Self> {
        let adapter = TargetProcessAdapter::new(&settings.url, settings.token.clone())?;
        let mut profile =
            SyncProfile::new(settings.default_label.clone()).with_labels(settings.labels.clone());
        if let Some(ref parent) = settings.default_parent_project {
            profile = profile.with_parent_project(parent.clone());
        }
        Ok(Self {
            adapter,
            settings,
            profile,
        })
    }

    /// Flatten stories depth-first: each story, then its tasks, then its bugs
    ///
    /// Sub-items inherit the story's key as parent and the story's project.
    /// Sub-items reporting a final state are dropped.
    pub fn normalize(&self, stories: Vec<UserStory>) -> TaskSet {
        let labels = &self.settings.labels;
        let mut tasks = TaskSet::new();

        for story in stories {
            let story_key = TaskKey::target_process(story.id);
            let project = story
                .project
                .map(|p| p.name)
                .unwrap_or_else(|| UNASSIGNED_TP_PROJECT.to_string());

            tasks.insert(
                ExternalTask::new(
                    story_key.clone(),
                    SourceKind::HierarchicalQuery,
                    story.story_name,
                    self.adapter.entity_url(EntityKind::UserStory, story.id),
                    project.clone(),
                )
                .with_labels(labels.iter().cloned()),
            );

            let children = story
                .tasks
                .into_iter()
                .map(|t| (EntityKind::Task, t))
                .chain(story.bugs.into_iter().map(|b| (EntityKind::Bug, b)));

            for (kind, sub) in children {
                if sub.is_final() {
                    continue;
                }
                tasks.insert(
                    ExternalTask::new(
                        TaskKey::target_process(sub.id),
                        SourceKind::HierarchicalQuery,
                        sub.name,
                        self.adapter.entity_url(kind, sub.id),
                        project.clone(),
                    )
                    .with_parent(story_key.clone())
                    .with_labels(labels.iter().cloned()),
                );
            }
        }

        tasks
    }
}

#[async_trait]
impl TaskSource for TargetProcessSource {
    fn name(&self) -> &str {
        "targetprocess"
    }

    fn profile(&self) -> &SyncProfile {
        &self.profile
    }

    async fn fetch_tasks(&self) -> Result<TaskSet> {
        info!(query = %self.settings.query, "Getting TargetProcess items");
        let stories = self
            .adapter
            .fetch_stories(&self.settings.query, self.settings.limit)
            .await?;
        let tasks = self.normalize(stories);
        debug!(count = tasks.len(), "Normalized TargetProcess items");
        Ok(tasks)
    }
}

/// Build the configured sources, GitHub first
pub fn sources_from_config(config: &NirvanaConfig) -> Result<Vec<Box<dyn TaskSource>>> {
    let mut sources: Vec<Box<dyn TaskSource>> = Vec::new();
    if let Some(ref github) = config.github {
        sources.push(Box::new(GitHubSource::new(github.clone())?));
    }
    if let Some(ref tp) = config.target_process {
        sources.push(Box::new(TargetProcessSource::new(tp.clone())?));
    }
    Ok(sources)
}
