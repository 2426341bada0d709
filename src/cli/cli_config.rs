use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::reconciler::ConflictPolicy;

/// Periodically mirrors a source directory into a replica directory.
///
/// Values given on the command line take precedence over the settings file.
#[derive(Parser, Debug, Clone, Default)]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from
    pub source: Option<PathBuf>,
    /// Directory to mirror into. Created when missing.
    pub replica: Option<PathBuf>,
    /// Seconds to wait between synchronization passes [default: 60]
    pub interval: Option<u64>,
    /// File that receives a copy of every log line
    pub log_file: Option<PathBuf>,

    /// YAML settings file providing defaults for the values above
    #[clap(long, short)]
    pub config: Option<PathBuf>,
    /// [default: info]
    #[clap(long, short, value_enum)]
    pub log_level: Option<LogLevel>,
    /// What to do when a path is a file on one side and a directory on the other [default: replace]
    #[clap(long, value_enum)]
    pub on_conflict: Option<ConflictPolicy>,
    /// Run a single pass and exit
    #[clap(long)]
    pub once: bool,
}
