//! Nirvana - mirror GitHub and TargetProcess work items into Todoist
//!
//! Each run pulls a snapshot of the Todoist account, fetches the current work
//! items from every configured source, and reconciles them: items that
//! disappeared from a source are completed, new ones are created and
//! existing ones have their content refreshed.
//!
//! # Architecture
//!
//! - **task**: Canonical external work items and their stable keys
//! - **mirror**: Mirror target model, session and command queue
//! - **integrations**: HTTP clients (GitHub, TargetProcess, Todoist)
//! - **sync**: Sources, the reconciler and the run driver
//! - **config**: YAML configuration, env overrides and validation

pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod mirror;
pub mod sync;
pub mod task;

// Re-exports
pub use error::{NirvanaError, Result};
