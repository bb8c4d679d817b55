//! External work items
//!
//! Canonical records produced by the source adapters, the key formatter that
//! identifies them, and the ordered set the reconciler consumes.

mod external_task;
mod key;
mod set;

pub use external_task::{ExternalTask, SourceKind};
pub use key::{GitHubKind, TaskKey};
pub use set::TaskSet;
