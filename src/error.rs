//! Error types for Nirvana
//!
//! Defines one error enum covering every failure mode of a sync run.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for Nirvana operations
pub type Result<T> = std::result::Result<T, NirvanaError>;

/// Comprehensive error type for Nirvana operations
#[derive(Error, Debug)]
pub enum NirvanaError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed validation (one message per problem)
    #[error("Invalid configuration:\n  {}", .0.join("\n  "))]
    Validation(Vec<String>),

    /// More than one mapping key matched the same value
    #[error("Ambiguous {map} entry for '{value}': keys {keys:?} all match")]
    AmbiguousMapping {
        map: String,
        value: String,
        keys: Vec<String>,
    },

    /// Connect or timeout failures, with the request URL stripped
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Rate limited (retry-after duration in seconds)
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Integration errors (GitHub, TargetProcess, Todoist)
    #[error("Integration error: {0}")]
    Integration(String),

    /// A batch commit to the mirror target was rejected in whole or in part
    #[error("Commit failed: {failed} of {total} commands rejected")]
    Commit { failed: usize, total: usize },

    /// Item, label or project id not present in the mirror snapshot
    #[error("Not found in mirror: {0}")]
    NotFound(String),

    /// Response bodies that did not decode
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl NirvanaError {
    /// Whether this error comes from reaching or authenticating against a remote
    /// system, as opposed to bad input
    pub fn is_connectivity(&self) -> bool {
        match self {
            NirvanaError::Network(_)
            | NirvanaError::Auth(_)
            | NirvanaError::RateLimited(_)
            | NirvanaError::Integration(_) => true,
            NirvanaError::Http(e) => e.is_connect() || e.is_timeout() || e.is_status(),
            _ => false,
        }
    }
}
