use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::{LoggingError, RuntimeConfig, SettingsError, setup_tracing};
use crate::cli::Cli;
use crate::ext::{AsyncTryInto, BestEffortPathExt};
use crate::reconciler::{ConfigError, Reconciler, TracingSink};
use crate::scheduler::Scheduler;

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let config: Result<RuntimeConfig, _> = cli.async_try_into().await;
        let config = config.context(ResolveSettingsSnafu)?;
        setup_tracing(&config).context(SetupLoggingSnafu)?;
        debug!("Resolved runtime config: {:?}", config);

        info!(
            "Mirroring {} into {} every {:?}",
            config.source.best_effort_path_display(),
            config.replica.best_effort_path_display(),
            config.interval
        );
        let reconciler = Reconciler::new(config.source, config.replica)
            .with_conflict_policy(config.on_conflict);
        let passes = Scheduler::new(reconciler, config.interval)
            .with_max_passes(config.max_passes)
            .run(&mut TracingSink)
            .await
            .context(SynchronizationSnafu)?;
        debug!("Finished after {passes} passes");

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while resolving settings"))]
    ResolveSettingsError { source: SettingsError },
    #[snafu(display("Critical failure encountered while setting up logging"))]
    SetupLoggingError { source: LoggingError },
    #[snafu(display("Critical failure encountered during synchronization"))]
    SynchronizationError { source: ConfigError },
}
