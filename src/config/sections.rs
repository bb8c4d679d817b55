//! Per-system configuration sections
//!
//! One section for the mirror target (Todoist) and one per source. Keys are
//! camelCase in the YAML file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TODOIST_URL: &str = "https://api.todoist.com/api/v1";
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
pub const DEFAULT_LIMIT: u32 = 100;

/// Todoist (mirror target) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoistSettings {
    /// API token (env override: TODOIST_TOKEN)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Sync API base URL
    #[serde(default = "default_todoist_url")]
    pub url: String,
}

fn default_todoist_url() -> String {
    DEFAULT_TODOIST_URL.to_string()
}

impl TodoistSettings {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: default_todoist_url(),
        }
    }
}

/// GitHub search source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSettings {
    /// API token (env override: GH_TOKEN)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// GitHub instance URL (e.g., "https://github.com" or a GitHub Enterprise host)
    #[serde(default = "default_github_url")]
    pub url: String,

    /// Issue search query, e.g. `is:open assignee:@me`
    #[serde(default)]
    pub query: String,

    /// Maximum number of search results to mirror
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Marker label put on every item this source creates
    #[serde(default = "default_github_label")]
    pub default_label: String,

    /// Labels added to every item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Key substring -> extra labels for matching items
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub label_map: BTreeMap<String, Vec<String>>,

    /// Repository substring -> project name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project_map: BTreeMap<String, String>,

    /// Project for every item, overriding `project_map`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

fn default_github_url() -> String {
    DEFAULT_GITHUB_URL.to_string()
}

fn default_github_label() -> String {
    "github".to_string()
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl GitHubSettings {
    pub fn new(token: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: default_github_url(),
            query: query.into(),
            limit: DEFAULT_LIMIT,
            default_label: default_github_label(),
            labels: Vec::new(),
            label_map: BTreeMap::new(),
            project_map: BTreeMap::new(),
            default_project: None,
        }
    }
}

/// TargetProcess hierarchical source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProcessSettings {
    /// Access token (env override: TP_TOKEN)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Instance URL, e.g. `https://acme.tpondemand.com`
    #[serde(default)]
    pub url: String,

    /// User story filter expression
    #[serde(default)]
    pub query: String,

    /// Maximum number of user stories to fetch
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Marker label put on every item this source creates
    #[serde(default = "default_tp_label")]
    pub default_label: String,

    /// Labels added to every item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Project every TargetProcess project is nested under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_parent_project: Option<String>,
}

fn default_tp_label() -> String {
    "targetprocess".to_string()
}

impl TargetProcessSettings {
    pub fn new(
        token: impl Into<String>,
        url: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            url: url.into(),
            query: query.into(),
            limit: DEFAULT_LIMIT,
            default_label: default_tp_label(),
            labels: Vec::new(),
            default_parent_project: None,
        }
    }
}
