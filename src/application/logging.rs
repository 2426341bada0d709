use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use snafu::prelude::*;
use supports_color::Stream;
use tracing_subscriber::{fmt, prelude::*, util::TryInitError};

use crate::application::RuntimeConfig;
use crate::ext::BestEffortPathExt;

/// Installs the global subscriber: compact console output on stderr, plus a
/// plain copy of every line in the log file when one is configured.
pub fn setup_tracing(config: &RuntimeConfig) -> Result<(), LoggingError> {
    let Some(level_filter) = config.log_level.to_level_filter() else {
        return Ok(());
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(supports_color::on(Stream::Stderr).is_some())
        .compact();

    let file_layer = config
        .log_file
        .as_deref()
        .map(open_log_file)
        .transpose()?
        .map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
        });

    tracing_subscriber::registry()
        .with(level_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context(InstallSnafu)
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(OpenLogFileSnafu { path })
}

#[derive(Debug, Snafu)]
pub enum LoggingError {
    #[snafu(display("Failed to open log file {}", path.best_effort_path_display()))]
    OpenLogFileError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to install the log subscriber"))]
    InstallError { source: TryInitError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_opened_for_appending() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("sync.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let mut file = open_log_file(&path).expect("Log file should open");
        std::io::Write::write_all(&mut file, b"next run\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "previous run\nnext run\n"
        );
    }

    #[test]
    fn log_file_in_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing").join("sync.log");

        let result = open_log_file(&path);

        assert!(matches!(result, Err(LoggingError::OpenLogFileError { .. })));
    }
}
