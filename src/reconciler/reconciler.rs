use std::io;
use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{IntoError, ResultExt, Snafu, ensure};
use tracing::debug;
use walkdir::WalkDir;

use crate::comparator::same_content;
use crate::ext::{BestEffortPathExt, best_effort_absolute};
use crate::filesystem::{EntryKind, TreeEntry};
use crate::reconciler::copy::copy_file;
use crate::reconciler::events::{
    CompareSnafu, ConflictSnafu, CopySnafu, CreateDirectorySnafu, DeleteSnafu, EntryError,
    EnumerateSnafu, InspectSnafu,
};
use crate::reconciler::{ConflictPolicy, EventSink, PassSummary, SyncEvent};

/// Makes a replica tree identical to a source tree.
///
/// Every call to [`Reconciler::run`] is a complete and independent pass:
/// the propagation phase walks the source and creates or overwrites whatever
/// the replica lacks, then the pruning phase walks the replica and removes
/// whatever the source lacks. Nothing is remembered between passes.
#[derive(Debug, Clone)]
pub struct Reconciler {
    source_root: PathBuf,
    replica_root: PathBuf,
    conflict_policy: ConflictPolicy,
}

impl Reconciler {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            conflict_policy: ConflictPolicy::default(),
        }
    }

    pub fn with_conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;
        self
    }

    /// Runs one full pass, reporting every mutation and every per-entry
    /// failure to `sink`.
    ///
    /// Only invalid roots fail the pass as a whole, and they are detected
    /// before anything is touched.
    pub async fn run<S: EventSink>(&self, sink: &mut S) -> Result<PassSummary, ConfigError> {
        self.validate_roots()?;

        let mut pass = Pass {
            reconciler: self,
            sink,
            summary: PassSummary::default(),
        };
        pass.ensure_replica_root().await?;
        pass.propagate().await;
        pass.prune().await;

        debug!("Pass finished: {}", pass.summary);
        Ok(pass.summary)
    }

    fn validate_roots(&self) -> Result<(), ConfigError> {
        let source_metadata = match self.source_root.metadata() {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return SourceMissingSnafu {
                    path: self.source_root.clone(),
                }
                .fail();
            }
            Err(error) => {
                return Err(error).context(SourceInaccessibleSnafu {
                    path: self.source_root.clone(),
                });
            }
        };
        ensure!(
            source_metadata.is_dir(),
            SourceNotDirectorySnafu {
                path: self.source_root.clone(),
            }
        );

        match self.replica_root.metadata() {
            Ok(metadata) => {
                ensure!(
                    metadata.is_dir(),
                    ReplicaNotDirectorySnafu {
                        path: self.replica_root.clone(),
                    }
                );
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(error).context(ReplicaInaccessibleSnafu {
                    path: self.replica_root.clone(),
                });
            }
        }

        let source = best_effort_absolute(&self.source_root);
        let replica = best_effort_absolute(&self.replica_root);
        ensure!(
            !source.starts_with(&replica) && !replica.starts_with(&source),
            OverlappingRootsSnafu {
                source_root: source,
                replica_root: replica,
            }
        );

        Ok(())
    }
}

struct Pass<'a, S: EventSink> {
    reconciler: &'a Reconciler,
    sink: &'a mut S,
    summary: PassSummary,
}

impl<S: EventSink> Pass<'_, S> {
    fn record(&mut self, event: SyncEvent) {
        self.summary.tally(&event);
        self.sink.record(event);
    }

    fn fail(&mut self, error: EntryError) {
        self.record(SyncEvent::Failed { error });
    }

    async fn ensure_replica_root(&mut self) -> Result<(), ConfigError> {
        let reconciler = self.reconciler;
        let replica_root = &reconciler.replica_root;
        if replica_root.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(replica_root)
            .await
            .context(ReplicaCreationSnafu {
                path: replica_root.clone(),
            })?;
        self.record(SyncEvent::DirectoryCreated {
            path: replica_root.clone(),
        });
        Ok(())
    }

    /// Walks the source top-down in name order. A directory is always yielded,
    /// and mirrored, before anything beneath it.
    async fn propagate(&mut self) {
        let reconciler = self.reconciler;
        let source_root = &reconciler.source_root;
        let mut walker = WalkDir::new(source_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(error) => {
                    self.report_walk_error(source_root, error);
                    continue;
                }
            };
            let Some(tree_entry) = TreeEntry::from_walk(source_root, &entry) else {
                continue;
            };

            match tree_entry.kind() {
                EntryKind::Directory => {
                    if !self.mirror_directory(&tree_entry).await {
                        walker.skip_current_dir();
                    }
                }
                EntryKind::File => self.mirror_file(&tree_entry).await,
                EntryKind::Other => debug!(
                    "Skipping {}, it is neither a regular file nor a directory",
                    entry.path().best_effort_path_display()
                ),
            }
        }
    }

    /// Returns whether the replica directory is in place so its contents can
    /// be mirrored.
    async fn mirror_directory(&mut self, tree_entry: &TreeEntry) -> bool {
        // The replica root is already in place, possibly behind a symbolic link
        if tree_entry.is_root() {
            return true;
        }
        let target = tree_entry.resolve(&self.reconciler.replica_root);

        match EntryKind::of_path(&target) {
            Ok(Some(EntryKind::Directory)) => true,
            Ok(None) => self.create_directory(target).await,
            Ok(Some(replica_kind)) => {
                if !self.resolve_conflict(&target, EntryKind::Directory, replica_kind) {
                    return false;
                }
                self.remove_file(&target).await && self.create_directory(target).await
            }
            Err(error) => {
                self.fail(InspectSnafu { path: target }.into_error(error));
                false
            }
        }
    }

    async fn mirror_file(&mut self, tree_entry: &TreeEntry) {
        let source = tree_entry.resolve(&self.reconciler.source_root);
        let target = tree_entry.resolve(&self.reconciler.replica_root);

        let ready_to_copy = match EntryKind::of_path(&target) {
            Ok(None) => true,
            Ok(Some(EntryKind::File)) => {
                match same_content(&source, &target).await.context(CompareSnafu {
                    target: target.clone(),
                }) {
                    Ok(same) => {
                        if same {
                            return;
                        }
                        true
                    }
                    Err(error) => {
                        self.fail(error);
                        return;
                    }
                }
            }
            Ok(Some(EntryKind::Directory)) => {
                self.resolve_conflict(&target, EntryKind::File, EntryKind::Directory)
                    && self.remove_directory(&target).await
            }
            // A link or other special node is never written through
            Ok(Some(EntryKind::Other)) => self.remove_file(&target).await,
            Err(error) => {
                self.fail(InspectSnafu { path: target }.into_error(error));
                return;
            }
        };

        if !ready_to_copy {
            return;
        }
        match copy_file(&source, &target).await.context(CopySnafu {
            target: target.clone(),
        }) {
            Ok(()) => self.record(SyncEvent::FileCopied { source, target }),
            Err(error) => self.fail(error),
        }
    }

    /// Returns whether the conflicting replica entry may be replaced.
    fn resolve_conflict(
        &mut self,
        target: &Path,
        source_kind: EntryKind,
        replica_kind: EntryKind,
    ) -> bool {
        match self.reconciler.conflict_policy {
            ConflictPolicy::Replace => {
                debug!(
                    "Replacing {} at {} with a {}",
                    replica_kind,
                    target.best_effort_path_display(),
                    source_kind
                );
                true
            }
            ConflictPolicy::Skip => {
                self.fail(
                    ConflictSnafu {
                        path: target.to_path_buf(),
                        source_kind,
                        replica_kind,
                    }
                    .build(),
                );
                false
            }
        }
    }

    /// Walks the replica top-down after propagation has finished, removing
    /// whatever has no counterpart in the source.
    async fn prune(&mut self) {
        let reconciler = self.reconciler;
        let replica_root = &reconciler.replica_root;
        let mut walker = WalkDir::new(replica_root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(error) => {
                    self.report_walk_error(replica_root, error);
                    continue;
                }
            };
            let Some(tree_entry) = TreeEntry::from_walk(replica_root, &entry) else {
                continue;
            };
            let is_directory = tree_entry.kind() == EntryKind::Directory;
            let source = tree_entry.resolve(&reconciler.source_root);

            match EntryKind::of_path(&source) {
                Ok(Some(EntryKind::Directory)) => {}
                Ok(Some(_)) => {
                    // A replica directory shadowing a source file survives only
                    // under the skip policy, and its contents are not ours to judge
                    if is_directory {
                        walker.skip_current_dir();
                    }
                }
                Ok(None) => {
                    if is_directory {
                        walker.skip_current_dir();
                        self.remove_directory(entry.path()).await;
                    } else {
                        self.remove_file(entry.path()).await;
                    }
                }
                Err(error) => {
                    if is_directory {
                        walker.skip_current_dir();
                    }
                    self.fail(InspectSnafu { path: source }.into_error(error));
                }
            }
        }
    }

    async fn create_directory(&mut self, path: PathBuf) -> bool {
        match fs::create_dir_all(&path).await.context(CreateDirectorySnafu {
            path: path.clone(),
        }) {
            Ok(()) => {
                self.record(SyncEvent::DirectoryCreated { path });
                true
            }
            Err(error) => {
                self.fail(error);
                false
            }
        }
    }

    async fn remove_file(&mut self, path: &Path) -> bool {
        match fs::remove_file(path).await.context(DeleteSnafu {
            path: path.to_path_buf(),
        }) {
            Ok(()) => {
                self.record(SyncEvent::FileDeleted {
                    path: path.to_path_buf(),
                });
                true
            }
            Err(error) => {
                self.fail(error);
                false
            }
        }
    }

    async fn remove_directory(&mut self, path: &Path) -> bool {
        match std::fs::remove_dir_all(path).context(DeleteSnafu {
            path: path.to_path_buf(),
        }) {
            Ok(()) => {
                self.record(SyncEvent::DirectoryDeleted {
                    path: path.to_path_buf(),
                });
                true
            }
            Err(error) => {
                self.fail(error);
                false
            }
        }
    }

    fn report_walk_error(&mut self, root: &Path, error: walkdir::Error) {
        let path = error.path().unwrap_or(root).to_path_buf();
        self.fail(EnumerateSnafu { path }.into_error(error));
    }
}

/// An invalid pair of roots. Nothing has been mutated when one is returned.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Source directory {} does not exist", path.best_effort_path_display()))]
    SourceMissing { path: PathBuf },
    #[snafu(display("Source {} is not a directory", path.best_effort_path_display()))]
    SourceNotDirectory { path: PathBuf },
    #[snafu(display("Failed to access source {}", path.best_effort_path_display()))]
    SourceInaccessible {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Replica {} exists but is not a directory", path.best_effort_path_display()))]
    ReplicaNotDirectory { path: PathBuf },
    #[snafu(display("Failed to access replica {}", path.best_effort_path_display()))]
    ReplicaInaccessible {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Source {} and replica {} overlap, one may not contain the other",
        source_root.display(),
        replica_root.display()
    ))]
    OverlappingRoots {
        source_root: PathBuf,
        replica_root: PathBuf,
    },
    #[snafu(display("Failed to create replica directory {}", path.best_effort_path_display()))]
    ReplicaCreation {
        path: PathBuf,
        source: std::io::Error,
    },
}
