//! Nirvana configuration file handling
//!
//! Loads the YAML config file (default `config.yaml`, overridable through
//! NIRVANA_CONFIG) and applies token overrides from the environment.

use super::sections::{GitHubSettings, TargetProcessSettings, TodoistSettings};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file name, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable overriding the config path
pub const CONFIG_PATH_ENV: &str = "NIRVANA_CONFIG";

pub const TODOIST_TOKEN_ENV: &str = "TODOIST_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GH_TOKEN";
pub const TARGET_PROCESS_TOKEN_ENV: &str = "TP_TOKEN";

/// Nirvana configuration
///
/// Every section is optional in the file. `todoist` is required by
/// validation; a source runs only when its section is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NirvanaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todoist: Option<TodoistSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_process: Option<TargetProcessSettings>,
}

impl NirvanaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::NirvanaError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Parsing config");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            github = config.github.is_some(),
            target_process = config.target_process.is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration and apply environment token overrides
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Apply TODOIST_TOKEN, GH_TOKEN and TP_TOKEN from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply token overrides using `lookup` to read variables
    ///
    /// TODOIST_TOKEN creates the `todoist` section when absent. GH_TOKEN and
    /// TP_TOKEN only fill sections already present in the file: a token on
    /// its own does not enable a source.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TODOIST_TOKEN_ENV).filter(|t| !t.is_empty()) {
            match self.todoist.as_mut() {
                Some(todoist) => todoist.token = token,
                None => self.todoist = Some(TodoistSettings::new(token)),
            }
        }

        if let Some(token) = lookup(GITHUB_TOKEN_ENV).filter(|t| !t.is_empty()) {
            if let Some(github) = self.github.as_mut() {
                github.token = token;
            }
        }

        if let Some(token) = lookup(TARGET_PROCESS_TOKEN_ENV).filter(|t| !t.is_empty()) {
            if let Some(tp) = self.target_process.as_mut() {
                tp.token = token;
            }
        }
    }
}
