use std::hash::Hasher;
use std::path::{Path, PathBuf};

use compio::BufResult;
use compio::fs::File;
use compio::io::AsyncReadAt;
use derive_more::Display;
use metrohash::MetroHash64;
use snafu::{ResultExt, Snafu};

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// Size of the buffer used when streaming file contents
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Digest of a file's full byte content.
///
/// Only ever compared for equality. Two files have the same content iff their
/// fingerprints match; hash collisions are not defended against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{_0:016x}")]
pub struct Fingerprint(u64);

impl AsyncTryFrom<&Path> for Fingerprint {
    type Error = FingerprintError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let metadata = path.metadata().context(OpenSnafu {
            path: path.to_path_buf(),
        })?;
        if !metadata.is_file() {
            return Err(FingerprintError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).await.context(OpenSnafu {
            path: path.to_path_buf(),
        })?;

        let mut hasher = MetroHash64::default();
        let mut buffer = Vec::with_capacity(CHUNK_SIZE);
        let mut position = 0u64;
        loop {
            buffer.clear();
            let BufResult(result, returned) = file.read_at(buffer, position).await;
            buffer = returned;
            let read = result.context(ReadSnafu {
                path: path.to_path_buf(),
            })?;
            if read == 0 {
                break;
            }
            hasher.write(&buffer[..read]);
            position += read as u64;
        }

        Ok(Fingerprint(hasher.finish()))
    }
}

/// Reads both files in full and compares their fingerprints.
///
/// There is deliberately no size or modification time shortcut: every call
/// re-reads both files. A failure on either side is returned, never folded
/// into "same" or "different".
pub async fn same_content(left: &Path, right: &Path) -> Result<bool, FingerprintError> {
    let left = Fingerprint::async_try_from(left).await?;
    let right = Fingerprint::async_try_from(right).await?;
    Ok(left == right)
}

#[derive(Debug, Snafu)]
pub enum FingerprintError {
    #[snafu(display("Failed to open {} for hashing", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to read {} while hashing", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot hash {}, it is not a regular file", path.best_effort_path_display()))]
    NotAFile { path: PathBuf },
}
