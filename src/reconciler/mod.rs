//! One-way reconciliation of a replica tree against a source tree.

mod conflict_policy;
mod copy;
mod events;
mod reconciler;
mod summary;

pub use conflict_policy::ConflictPolicy;
pub use copy::FileCopyError;
pub use events::{EventSink, SyncEvent, TracingSink};
pub use reconciler::{ConfigError, Reconciler};
pub use summary::PassSummary;
