//! Todoist mirror target
//!
//! Talks to the Todoist Sync API: a full sync pulls items, labels, projects
//! and the user in one request, and queued commands are posted back in
//! batches.

use super::{check_status, request_error};
use crate::mirror::{
    Command, CommitReport, ItemId, Label, LabelId, MirrorItem, MirrorTarget, Project, ProjectId,
    Snapshot,
};
use crate::{NirvanaError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, error, info};

/// The Sync API accepts at most 100 commands per request
pub const MAX_COMMANDS_PER_REQUEST: usize = 100;

/// Per-request timeout for a full sync (returns every item in the account)
const SYNC_TIMEOUT: Duration = Duration::from_secs(60);

const RESOURCE_TYPES: &str = r#"["items","labels","projects","user"]"#;

/// Todoist Sync API client
pub struct TodoistClient {
    client: Client,
    sync_url: String,
    token: String,
}

/// Full sync response, restricted to the resources we ask for
#[derive(Debug, Default, Deserialize)]
struct SyncResponse {
    #[serde(default)]
    items: Vec<TodoistItem>,
    #[serde(default)]
    labels: Vec<TodoistLabel>,
    #[serde(default)]
    projects: Vec<TodoistProject>,
    #[serde(default)]
    user: Option<TodoistUser>,
}

#[derive(Debug, Deserialize)]
struct TodoistItem {
    id: String,
    content: String,
    project_id: String,
    #[serde(default)]
    parent_id: Option<String>,
    /// Label names
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    checked: bool,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct TodoistLabel {
    id: String,
    name: String,
    #[serde(default)]
    is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct TodoistProject {
    id: String,
    name: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    is_archived: bool,
}

#[derive(Debug, Deserialize)]
struct TodoistUser {
    #[serde(default)]
    full_name: Option<String>,
}

/// Response to a command batch
#[derive(Debug, Default, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    sync_status: HashMap<String, serde_json::Value>,
    #[serde(default)]
    temp_id_mapping: HashMap<String, String>,
}

/// Command as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
struct WireCommand {
    #[serde(rename = "type")]
    kind: &'static str,
    uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temp_id: Option<String>,
    args: serde_json::Value,
}

impl WireCommand {
    fn from_command(command: &Command) -> Self {
        let (kind, args) = match command {
            Command::AddItem {
                content,
                project_id,
                parent_id,
                labels,
                ..
            } => {
                let mut args = serde_json::json!({
                    "content": content,
                    "project_id": project_id.as_str(),
                    "labels": labels,
                });
                if let Some(parent) = parent_id {
                    args["parent_id"] = serde_json::Value::from(parent.as_str());
                }
                ("item_add", args)
            }
            Command::UpdateItem { id, content } => (
                "item_update",
                serde_json::json!({ "id": id.as_str(), "content": content }),
            ),
            Command::CompleteItem { id } => {
                ("item_complete", serde_json::json!({ "id": id.as_str() }))
            }
            Command::AddLabel { name, .. } => ("label_add", serde_json::json!({ "name": name })),
            Command::AddProject { name, .. } => {
                ("project_add", serde_json::json!({ "name": name }))
            }
            Command::MoveProject { id, parent_id } => (
                "project_move",
                serde_json::json!({ "id": id.as_str(), "parent_id": parent_id.as_str() }),
            ),
        };

        Self {
            kind,
            uuid: uuid::Uuid::new_v4().to_string(),
            temp_id: command.temp_id().map(str::to_string),
            args,
        }
    }
}

impl SyncResponse {
    /// Live objects only: deleted, archived and checked entries are dropped
    fn into_snapshot(self) -> Snapshot {
        let labels: Vec<Label> = self
            .labels
            .into_iter()
            .filter(|l| !l.is_deleted)
            .map(|l| Label {
                id: LabelId::new(l.id),
                name: l.name,
            })
            .collect();

        // Items carry label names; the session works with ids
        let mut label_ids_by_name: HashMap<&str, &LabelId> = HashMap::new();
        for label in &labels {
            label_ids_by_name.entry(label.name.as_str()).or_insert(&label.id);
        }

        let items = self
            .items
            .into_iter()
            .filter(|i| !i.is_deleted && !i.checked)
            .map(|i| MirrorItem {
                id: ItemId::new(i.id),
                content: i.content,
                project_id: ProjectId::new(i.project_id),
                parent_id: i.parent_id.map(ItemId::new),
                label_ids: i
                    .labels
                    .iter()
                    .filter_map(|name| label_ids_by_name.get(name.as_str()).map(|id| (*id).clone()))
                    .collect::<BTreeSet<_>>(),
                completed: false,
            })
            .collect();

        let projects = self
            .projects
            .into_iter()
            .filter(|p| !p.is_deleted && !p.is_archived)
            .map(|p| Project {
                id: ProjectId::new(p.id),
                name: p.name,
                parent_id: p.parent_id.map(ProjectId::new),
            })
            .collect();

        Snapshot {
            items,
            labels,
            projects,
            user_name: self.user.and_then(|u| u.full_name),
        }
    }
}

impl CommandResponse {
    /// `(uuid, error)` for every command the target did not accept
    fn failures(&self) -> Vec<(&str, String)> {
        let mut failures: Vec<(&str, String)> = self
            .sync_status
            .iter()
            .filter(|(_, status)| status.as_str() != Some("ok"))
            .map(|(uuid, status)| {
                let message = status
                    .get("error")
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string());
                (uuid.as_str(), message)
            })
            .collect();
        failures.sort();
        failures
    }
}

impl TodoistClient {
    /// Create a new client for the Sync API rooted at `url`
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            sync_url: format!("{}/sync", url.trim_end_matches('/')),
            token: token.into(),
        })
    }

    async fn post_commands(&self, commands: &[WireCommand]) -> Result<CommandResponse> {
        let payload = serde_json::to_string(commands)?;

        let response = self
            .client
            .post(&self.sync_url)
            .bearer_auth(&self.token)
            .form(&[("commands", payload)])
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "Todoist").await?;
        response.json().await.map_err(request_error)
    }
}

#[async_trait]
impl MirrorTarget for TodoistClient {
    fn name(&self) -> &str {
        "todoist"
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        debug!(url = %self.sync_url, "Running full Todoist sync");

        let response = self
            .client
            .post(&self.sync_url)
            .bearer_auth(&self.token)
            .form(&[("sync_token", "*"), ("resource_types", RESOURCE_TYPES)])
            .timeout(SYNC_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let response = check_status(response, "Todoist").await?;
        let sync: SyncResponse = response.json().await.map_err(request_error)?;
        let snapshot = sync.into_snapshot();

        info!(
            items = snapshot.items.len(),
            labels = snapshot.labels.len(),
            projects = snapshot.projects.len(),
            "Fetched Todoist snapshot"
        );

        Ok(snapshot)
    }

    async fn commit(&self, commands: Vec<Command>) -> Result<CommitReport> {
        let total = commands.len();
        let mut report = CommitReport::default();

        for chunk in commands.chunks(MAX_COMMANDS_PER_REQUEST) {
            let wire: Vec<WireCommand> = chunk
                .iter()
                .map(|command| {
                    let mut command = command.clone();
                    command.remap_ids(&report.temp_id_mapping);
                    WireCommand::from_command(&command)
                })
                .collect();

            debug!(count = wire.len(), "Posting Todoist commands");
            let response = self.post_commands(&wire).await?;

            let failures = response.failures();
            if !failures.is_empty() {
                for (uuid, message) in &failures {
                    let kind = wire
                        .iter()
                        .find(|w| w.uuid == *uuid)
                        .map(|w| w.kind)
                        .unwrap_or("unknown");
                    error!(uuid = %uuid, command = kind, error = %message, "Todoist rejected command");
                }
                return Err(NirvanaError::Commit {
                    failed: failures.len(),
                    total,
                });
            }

            report.applied += wire.len();
            report.temp_id_mapping.extend(response.temp_id_mapping);
        }

        info!(applied = report.applied, "Committed Todoist commands");
        Ok(report)
    }
}
