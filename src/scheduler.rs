//! Fixed-cadence driver for the ingestion step.
//!
//! One cycle runs immediately, then one per interval. A cycle that overruns
//! the interval is followed straight away by the next one; missed ticks are
//! not queued up. The loop stops when its [`CancellationToken`] fires, even
//! in the middle of a cycle.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigError;
use crate::feed::FeedFetcher;
use crate::ingest::{IngestError, IngestReport, Ingestor};
use crate::storage::FeedStore;
use crate::util::parse_interval;

pub struct Scheduler<S, F> {
    ingestor: Ingestor<S, F>,
    interval: Duration,
}

impl<S, F> Scheduler<S, F>
where
    S: FeedStore + 'static,
    F: FeedFetcher + 'static,
{
    /// Fails with `ConfigError::InvalidInterval` for a zero interval.
    pub fn new(ingestor: Ingestor<S, F>, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                input: format!("{interval:?}"),
                reason: "interval must be positive".to_string(),
            });
        }
        Ok(Self { ingestor, interval })
    }

    /// Parses `"30s"`, `"1m"`, `"1h30m"` and friends. Nothing runs if the
    /// string is rejected.
    pub fn from_interval_str(ingestor: Ingestor<S, F>, raw: &str) -> Result<Self, ConfigError> {
        Self::new(ingestor, parse_interval(raw)?)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until `shutdown` is cancelled. Returns the number of cycles that
    /// ran to completion, failed ones included.
    pub async fn run(self, shutdown: CancellationToken) -> usize {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Collecting feeds every {:?}",
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested during a cycle, abandoning it");
                    break;
                }
                result = self.ingestor.ingest_once() => {
                    cycles += 1;
                    log_cycle(cycles, result);
                }
            }
        }

        tracing::info!(cycles, "Scheduler stopped");
        cycles
    }

    /// Moves the scheduler onto its own task.
    pub fn spawn(self) -> SchedulerHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(shutdown.clone()));
        SchedulerHandle { shutdown, task }
    }
}

fn log_cycle(cycle: usize, result: Result<IngestReport, IngestError>) {
    match result {
        Ok(report) => tracing::debug!(
            cycle,
            feed = %report.feed_name,
            found = report.items_found,
            inserted = report.inserted,
            failed = report.failed,
            "Cycle complete"
        ),
        Err(e) if e.is_no_feeds() => {
            tracing::info!(cycle, "No feeds to fetch, waiting for the next tick")
        }
        // Logged by the ingestor where it happened
        Err(IngestError::Fetch { .. }) => tracing::debug!(cycle, "Cycle ended after fetch failure"),
        Err(IngestError::Storage(_)) => {
            tracing::debug!(cycle, "Cycle ended after storage failure")
        }
    }
}

/// A running scheduler task.
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<usize>,
}

impl SchedulerHandle {
    /// A token that stops the scheduler when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels the loop and waits for it. Returns the completed cycle count.
    pub async fn stop(self) -> usize {
        self.shutdown.cancel();
        self.wait().await
    }

    /// Waits for the loop to end on its own (its token cancelled elsewhere).
    pub async fn wait(self) -> usize {
        match self.task.await {
            Ok(cycles) => cycles,
            Err(e) => {
                tracing::error!(error = %e, "Scheduler task failed");
                0
            }
        }
    }
}
