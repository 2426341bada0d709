use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use snafu::prelude::*;

use crate::application::data::LogLevel;
use crate::cli::Cli;
use crate::config::{SettingsFile, SettingsFileError};
use crate::ext::AsyncTryFrom;
use crate::reconciler::ConflictPolicy;

const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Fully resolved settings: command line first, then the settings file, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,
    pub on_conflict: ConflictPolicy,
    pub max_passes: Option<NonZeroU64>,
}

impl RuntimeConfig {
    pub fn merge(cli: Cli, settings: SettingsFile) -> Result<Self, SettingsError> {
        let source = cli
            .source
            .or(settings.source)
            .context(MissingValueSnafu { name: "source" })?;
        let replica = cli
            .replica
            .or(settings.replica)
            .context(MissingValueSnafu { name: "replica" })?;

        let interval_secs = cli
            .interval
            .or(settings.interval)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        ensure!(interval_secs > 0, ZeroIntervalSnafu);

        Ok(Self {
            source,
            replica,
            interval: Duration::from_secs(interval_secs),
            log_file: cli.log_file.or(settings.log_file),
            log_level: cli.log_level.or(settings.log_level).unwrap_or_default(),
            on_conflict: cli.on_conflict.or(settings.on_conflict).unwrap_or_default(),
            max_passes: cli.once.then_some(NonZeroU64::MIN),
        })
    }
}

impl AsyncTryFrom<Cli> for RuntimeConfig {
    type Error = SettingsError;

    async fn async_try_from(cli: Cli) -> Result<Self, Self::Error> {
        let settings = match &cli.config {
            Some(path) => SettingsFile::from_path(path).await.context(LoadSnafu)?,
            None => SettingsFile::default(),
        };
        Self::merge(cli, settings)
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to load the settings file"))]
    LoadError { source: SettingsFileError },
    #[snafu(display(
        "No {} directory given, pass it on the command line or set '{}' in the settings file",
        name,
        name
    ))]
    MissingValueError { name: &'static str },
    #[snafu(display("The synchronization interval must be at least one second"))]
    ZeroIntervalError,
}
