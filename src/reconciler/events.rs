use std::path::PathBuf;

use derive_more::Display;
use snafu::Snafu;
use tracing::{error, info};

use crate::comparator::FingerprintError;
use crate::ext::BestEffortPathExt;
use crate::filesystem::EntryKind;
use crate::reconciler::FileCopyError;

/// Something a reconciliation pass did to the replica, or failed to do.
#[derive(Debug, Display)]
pub enum SyncEvent {
    #[display("Created directory: {}", path.display())]
    DirectoryCreated { path: PathBuf },
    #[display("Deleted directory: {}", path.display())]
    DirectoryDeleted { path: PathBuf },
    #[display("Copied file from {} to {}", source.display(), target.display())]
    FileCopied { source: PathBuf, target: PathBuf },
    #[display("Deleted file: {}", path.display())]
    FileDeleted { path: PathBuf },
    #[display("{error}")]
    Failed { error: EntryError },
}

impl SyncEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncEvent::Failed { .. })
    }
}

/// Receives every event of a reconciliation pass.
///
/// The reconciler never decides where events end up; a console, a log file
/// or a test double are all equally valid recipients.
pub trait EventSink {
    fn record(&mut self, event: SyncEvent);
}

impl EventSink for Vec<SyncEvent> {
    fn record(&mut self, event: SyncEvent) {
        self.push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, event: SyncEvent) {
        (**self).record(event);
    }
}

/// Forwards events to `tracing`, failures at error level and mutations at info
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: SyncEvent) {
        if event.is_failure() {
            error!("{event}");
        } else {
            info!("{event}");
        }
    }
}

/// A failure confined to a single entry. The pass reports it and moves on.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EntryError {
    #[snafu(display("Failed to enumerate {}", path.best_effort_path_display()))]
    EnumerateError {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[snafu(display("Failed to inspect {}", path.best_effort_path_display()))]
    InspectError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to compare contents of {}", target.best_effort_path_display()))]
    CompareError {
        target: PathBuf,
        source: FingerprintError,
    },
    #[snafu(display("Failed to create directory {}", path.best_effort_path_display()))]
    CreateDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to copy into {}", target.best_effort_path_display()))]
    CopyError {
        target: PathBuf,
        source: FileCopyError,
    },
    #[snafu(display("Failed to delete {}", path.best_effort_path_display()))]
    DeleteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Type conflict at {}: source is a {}, replica is a {}",
        path.best_effort_path_display(),
        source_kind,
        replica_kind
    ))]
    ConflictError {
        path: PathBuf,
        source_kind: EntryKind,
        replica_kind: EntryKind,
    },
}
