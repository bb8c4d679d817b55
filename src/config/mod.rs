//! Configuration system
//!
//! Loads the YAML config file (`config.yaml` by default) with support for:
//! - The Todoist mirror target (required)
//! - A GitHub search source and a TargetProcess story source (optional)
//! - Token overrides from TODOIST_TOKEN, GH_TOKEN and TP_TOKEN

mod nirvana_config;
mod sections;
pub mod validation;

pub use nirvana_config::{
    NirvanaConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, GITHUB_TOKEN_ENV,
    TARGET_PROCESS_TOKEN_ENV, TODOIST_TOKEN_ENV,
};
pub use sections::{
    GitHubSettings, TargetProcessSettings, TodoistSettings, DEFAULT_GITHUB_URL, DEFAULT_LIMIT,
    DEFAULT_TODOIST_URL,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
