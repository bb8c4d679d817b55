//! Stable keys for external work items
//!
//! A key is derived only from immutable identity fields (numeric id,
//! repository name, issue number) so the same external item yields the same
//! key on every run. Mirrored items carry their key as a bracketed prefix of
//! their content: `[KEY](url) - title`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of GitHub search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubKind {
    Issue,
    PullRequest,
}

impl GitHubKind {
    fn as_str(self) -> &'static str {
        match self {
            GitHubKind::Issue => "issue",
            GitHubKind::PullRequest => "pr",
        }
    }
}

/// Type-safe wrapper for external task keys
///
/// Format: `TP#123` for TargetProcess entities,
/// `owner/repo issue#42` or `owner/repo pr#7` for GitHub results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey(String);

impl TaskKey {
    /// Create a key from an already formatted string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a TargetProcess entity (story, task or bug share one id space)
    pub fn target_process(id: u64) -> Self {
        Self(format!("TP#{}", id))
    }

    /// Key for a GitHub issue or pull request
    pub fn github(repository_full_name: &str, kind: GitHubKind, number: u64) -> Self {
        Self(format!(
            "{} {}#{}",
            repository_full_name,
            kind.as_str(),
            number
        ))
    }

    /// Parse the key out of mirrored item content
    ///
    /// Returns the text between a leading `[` and the first `]`, or `None`
    /// when the content has no bracketed prefix.
    pub fn from_content(content: &str) -> Option<Self> {
        let rest = content.trim_start().strip_prefix('[')?;
        let end = rest.find(']')?;
        let key = rest[..end].trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TaskKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
