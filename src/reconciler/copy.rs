use std::fs::Metadata;
use std::hash::Hasher;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::{self, File};
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use filetime::FileTime;
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::comparator::CHUNK_SIZE;
use crate::ext::BestEffortPathExt;

const TEMPORARY_PREFIX: &str = ".foldersync-";
const TEMPORARY_SUFFIX: &str = ".tmp";

/// The sibling of `target` that a copy is staged in before it replaces `target`.
///
/// Derived from a hash of the file name so the staging name has a fixed
/// length no matter how long the target name is.
pub fn temporary_path(target: &Path) -> PathBuf {
    let mut hasher = MetroHash64::default();
    if let Some(file_name) = target.file_name() {
        hasher.write(file_name.as_encoded_bytes());
    }
    target.with_file_name(format!(
        "{TEMPORARY_PREFIX}{:016x}{TEMPORARY_SUFFIX}",
        hasher.finish()
    ))
}

/// Copies the bytes, permissions and timestamps of `source` over `target`.
///
/// The data is streamed into a temporary sibling first and renamed into place,
/// so `target` is either left untouched or fully replaced.
pub async fn copy_file(source: &Path, target: &Path) -> Result<(), FileCopyError> {
    let temporary = temporary_path(target);

    let mut result = stage_copy(source, &temporary).await;
    if result.is_ok() {
        result = fs::rename(&temporary, target).await.context(ReplaceSnafu {
            path: target.to_path_buf(),
        });
    }

    if result.is_err() {
        if let Err(error) = fs::remove_file(&temporary).await {
            debug!(
                "No staged copy to clean up at {}: {}",
                temporary.best_effort_path_display(),
                error
            );
        }
    }

    result
}

async fn stage_copy(source: &Path, temporary: &Path) -> Result<(), FileCopyError> {
    let metadata = source.metadata().context(OpenSourceSnafu {
        path: source.to_path_buf(),
    })?;
    let reader = File::open(source).await.context(OpenSourceSnafu {
        path: source.to_path_buf(),
    })?;
    let mut writer = File::create(temporary).await.context(CreateTemporarySnafu {
        path: temporary.to_path_buf(),
    })?;

    let mut buffer = Vec::with_capacity(CHUNK_SIZE);
    let mut position = 0u64;
    loop {
        buffer.clear();
        let BufResult(result, returned) = reader.read_at(buffer, position).await;
        buffer = returned;
        let read = result.context(ReadSourceSnafu {
            path: source.to_path_buf(),
        })?;
        if read == 0 {
            break;
        }

        let BufResult(result, returned) = writer.write_all_at(buffer, position).await;
        buffer = returned;
        result.context(WriteTemporarySnafu {
            path: temporary.to_path_buf(),
        })?;
        position += read as u64;
    }
    drop(writer);

    if position != metadata.len() {
        warn!(
            "{} changed size while being copied",
            source.best_effort_path_display()
        );
    }

    preserve_metadata(&metadata, temporary)
}

fn preserve_metadata(metadata: &Metadata, destination: &Path) -> Result<(), FileCopyError> {
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(metadata),
        FileTime::from_last_modification_time(metadata),
    )
    .context(PreserveMetadataSnafu {
        path: destination.to_path_buf(),
    })?;

    std::fs::set_permissions(destination, metadata.permissions()).context(
        PreserveMetadataSnafu {
            path: destination.to_path_buf(),
        },
    )
}

#[derive(Debug, Snafu)]
pub enum FileCopyError {
    #[snafu(display("Failed to open source file {}", path.best_effort_path_display()))]
    OpenSourceError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read source file {}", path.best_effort_path_display()))]
    ReadSourceError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create staging file {}", path.best_effort_path_display()))]
    CreateTemporaryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write staging file {}", path.best_effort_path_display()))]
    WriteTemporaryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to apply timestamps and permissions to {}", path.best_effort_path_display()))]
    PreserveMetadataError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to move the staged copy over {}", path.best_effort_path_display()))]
    ReplaceError {
        path: PathBuf,
        source: std::io::Error,
    },
}
