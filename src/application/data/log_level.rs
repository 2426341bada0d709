use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;

/// Verbosity of both the console and the log file.
///
/// Mutations of the replica are logged at `info`, so anything quieter only
/// shows problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    /// `None` means nothing should be logged at all.
    pub fn to_level_filter(self) -> Option<LevelFilter> {
        match self {
            LogLevel::Debug => Some(LevelFilter::DEBUG),
            LogLevel::Info => Some(LevelFilter::INFO),
            LogLevel::Warn => Some(LevelFilter::WARN),
            LogLevel::Error => Some(LevelFilter::ERROR),
            LogLevel::Silent => None,
        }
    }
}
