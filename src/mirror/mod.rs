//! Mirror target
//!
//! The task list that receives mirrored items. A run pulls one [`Snapshot`],
//! works against it through a [`MirrorSession`], and flushes the queued
//! [`Command`]s through a [`MirrorTarget`] once per source.
//!
//! # Implementations
//!
//! - [`crate::integrations::TodoistClient`]: the Todoist Sync API
//! - [`InMemoryMirror`]: in-process target for tests

mod command;
mod memory;
mod session;
mod target;
mod types;

pub use command::{Command, CommitReport};
pub use memory::InMemoryMirror;
pub use session::MirrorSession;
pub use target::MirrorTarget;
pub use types::{ItemId, Label, LabelId, MirrorItem, Project, ProjectId, Snapshot};
