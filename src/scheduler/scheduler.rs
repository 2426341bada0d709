use std::num::NonZeroU64;
use std::time::Duration;

use snafu::Report;
use tracing::{debug, error, info};

use crate::reconciler::{ConfigError, EventSink, Reconciler};

/// Re-runs a [`Reconciler`] at a fixed interval.
///
/// Passes never overlap: the next one starts `interval` after the previous
/// one finished.
#[derive(Debug, Clone)]
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
    max_passes: Option<NonZeroU64>,
}

impl Scheduler {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
            max_passes: None,
        }
    }

    /// Stops after `max_passes` passes instead of running forever
    pub fn with_max_passes(mut self, max_passes: Option<NonZeroU64>) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Runs passes until the pass limit is reached, returning how many ran.
    ///
    /// A configuration error on the very first pass is returned, since the
    /// roots were never valid. Later ones are logged and retried on the next
    /// tick, as a source that disappears may well come back.
    pub async fn run<S: EventSink>(&self, sink: &mut S) -> Result<u64, ConfigError> {
        let mut completed = 0u64;

        loop {
            info!("Starting synchronization...");
            match self.reconciler.run(sink).await {
                Ok(summary) if summary.mutations() == 0 && summary.errors == 0 => {
                    info!("Synchronization complete: replica already up to date")
                }
                Ok(summary) => info!("Synchronization complete: {summary}"),
                Err(error) if completed == 0 => return Err(error),
                Err(error) => error!("Synchronization skipped: {}", Report::from_error(error)),
            }
            completed += 1;

            if self
                .max_passes
                .is_some_and(|max_passes| completed >= max_passes.get())
            {
                debug!("Reached the limit of {completed} passes");
                return Ok(completed);
            }

            debug!("Sleeping for {:?} before the next pass", self.interval);
            compio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::fixtures::{snapshot, write_tree};
    use crate::reconciler::SyncEvent;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SHORT_INTERVAL: Duration = Duration::from_millis(5);

    #[compio::test]
    async fn bounded_scheduler_runs_the_requested_number_of_passes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        write_tree(&source, &[("a.txt", Some("a")), ("dir/b.txt", Some("b"))]);
        let scheduler = Scheduler::new(Reconciler::new(&source, &replica), SHORT_INTERVAL)
            .with_max_passes(NonZeroU64::new(3));
        let mut events: Vec<SyncEvent> = Vec::new();

        let passes = scheduler.run(&mut events).await.expect("Scheduler failed");

        assert_eq!(passes, 3);
        assert_eq!(snapshot(&replica), snapshot(&source));
        // Only the first pass had anything to do
        let copies = events
            .iter()
            .filter(|event| matches!(event, SyncEvent::FileCopied { .. }))
            .count();
        assert_eq!(copies, 2);
    }

    #[compio::test]
    async fn invalid_roots_on_first_pass_are_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scheduler = Scheduler::new(
            Reconciler::new(temp_dir.path().join("absent"), temp_dir.path().join("replica")),
            SHORT_INTERVAL,
        );
        let mut events: Vec<SyncEvent> = Vec::new();

        let result = scheduler.run(&mut events).await;

        assert!(matches!(result, Err(ConfigError::SourceMissing { .. })));
    }

    /// Removes the source tree as soon as the first event arrives
    struct SourceRemover {
        source: PathBuf,
        events: Vec<SyncEvent>,
    }

    impl EventSink for SourceRemover {
        fn record(&mut self, event: SyncEvent) {
            if self.events.is_empty() {
                fs::remove_dir_all(&self.source).expect("Failed to remove source");
            }
            self.events.push(event);
        }
    }

    #[compio::test]
    async fn vanished_source_after_first_pass_is_survived() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let replica = temp_dir.path().join("replica");
        fs::create_dir(&source).unwrap();
        let scheduler = Scheduler::new(Reconciler::new(&source, &replica), SHORT_INTERVAL)
            .with_max_passes(NonZeroU64::new(2));
        let mut sink = SourceRemover {
            source: source.clone(),
            events: Vec::new(),
        };

        let passes = scheduler.run(&mut sink).await.expect("Scheduler should keep going");

        assert_eq!(passes, 2);
        assert_eq!(sink.events.len(), 2, "Unexpected events: {:?}", sink.events);
        assert!(matches!(&sink.events[0], SyncEvent::DirectoryCreated { path } if path == &replica));
        assert!(sink.events[1].is_failure());
        assert!(replica.is_dir());
    }
}
