use derive_more::Display;

use crate::reconciler::SyncEvent;

/// Counts of what one reconciliation pass recorded
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display(
    "{directories_created} directories created, {files_copied} files copied, \
     {files_deleted} files deleted, {directories_deleted} directories deleted, {errors} errors"
)]
pub struct PassSummary {
    pub directories_created: usize,
    pub directories_deleted: usize,
    pub files_copied: usize,
    pub files_deleted: usize,
    pub errors: usize,
}

impl PassSummary {
    pub fn tally(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::DirectoryCreated { .. } => self.directories_created += 1,
            SyncEvent::DirectoryDeleted { .. } => self.directories_deleted += 1,
            SyncEvent::FileCopied { .. } => self.files_copied += 1,
            SyncEvent::FileDeleted { .. } => self.files_deleted += 1,
            SyncEvent::Failed { .. } => self.errors += 1,
        }
    }

    pub fn mutations(&self) -> usize {
        self.directories_created + self.directories_deleted + self.files_copied + self.files_deleted
    }
}
