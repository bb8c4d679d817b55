//! TargetProcess REST adapter
//!
//! Fetches user stories through the v2 query API. Each story carries its
//! open tasks and bugs, so one request returns the whole hierarchy.

use super::{check_status, request_error};
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for story queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Projection requested for every user story
const STORY_SELECT: &str = "{id,storyName:name,\
tasks:Tasks.Where(EntityState.IsFinal!=true).Select({id,name,isFinal:EntityState.IsFinal}),\
bugs:Bugs.Where(EntityState.IsFinal!=true).Select({id,name,isFinal:EntityState.IsFinal}),\
project:{project.id,project.name}}";

/// TargetProcess API client
pub struct TargetProcessAdapter {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StoryPage {
    #[serde(default)]
    items: Vec<UserStory>,
}

/// User story with its open tasks and bugs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStory {
    pub id: u64,
    pub story_name: String,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub tasks: Vec<SubItem>,
    #[serde(default)]
    pub bugs: Vec<SubItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRef {
    pub id: u64,
    pub name: String,
}

/// Task or bug nested under a user story
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubItem {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_final: Option<bool>,
}

impl SubItem {
    pub fn is_final(&self) -> bool {
        self.is_final == Some(true)
    }
}

/// Entity kinds addressable on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    UserStory,
    Task,
    Bug,
}

impl EntityKind {
    fn page(&self) -> &'static str {
        match self {
            EntityKind::UserStory => "userstory",
            EntityKind::Task => "task",
            EntityKind::Bug => "bug",
        }
    }
}

impl TargetProcessAdapter {
    /// Create a new adapter for an instance such as `https://acme.tpondemand.com`
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            access_token: token.into(),
        })
    }

    /// Board URL for an entity
    pub fn entity_url(&self, kind: EntityKind, id: u64) -> String {
        format!("{}/RestUI/Board.aspx#page={}/{}", self.base_url, kind.page(), id)
    }

    fn query_params(&self, filter: &str, limit: u32) -> Vec<(&'static str, String)> {
        vec![
            ("filter", format!("?{}", filter)),
            ("take", limit.to_string()),
            ("select", STORY_SELECT.to_string()),
            ("access_token", self.access_token.clone()),
        ]
    }

    /// Fetch up to `limit` user stories matching `filter`
    pub async fn fetch_stories(&self, filter: &str, limit: u32) -> Result<Vec<UserStory>> {
        let url = format!("{}/api/v2/userstories", self.base_url);
        debug!(filter = %filter, limit = %limit, "Fetching TargetProcess user stories");

        let response = self
            .client
            .get(&url)
            .query(&self.query_params(filter, limit))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "TargetProcess").await?;
        let page: StoryPage = response.json().await.map_err(request_error)?;

        info!(count = page.items.len(), "Fetched TargetProcess user stories");
        if is_truncated(page.items.len(), limit) {
            warn!(
                limit = %limit,
                "TargetProcess returned as many stories as the limit; stories past it \
                 are treated as closed and their items completed. Raise targetProcess.limit"
            );
        }
        Ok(page.items)
    }
}

/// Whether a result set filled the whole limit and may have been cut short
pub(crate) fn is_truncated(returned: usize, limit: u32) -> bool {
    returned as u64 >= u64::from(limit)
}
