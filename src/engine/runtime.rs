// src/engine/runtime.rs

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::engine::daemon::Daemon;
use crate::engine::reducer::{filter_batch, resolve_jobs};
use crate::errors::Result;
use crate::exec::DispatchPool;
use crate::types::Batch;
use crate::watch::EventCollector;

/// What one processing cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub events: usize,
    pub jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs still pending after the cycle (failures plus anything queued
    /// concurrently by the control endpoint).
    pub pending: usize,
}

/// Drives the notification loop: collector → reducer → dispatch pool →
/// pending cleanup, one cycle at a time.
///
/// A cycle's dispatch is fully joined before the next batch is processed.
pub struct Runtime {
    daemon: Daemon,
    collector: EventCollector,
    pool: DispatchPool,
    retry_after: Duration,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pool", &self.pool)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// `retry_after` is how long an idle daemon waits before running the
    /// pending jobs again without new events.
    pub fn new(
        daemon: Daemon,
        collector: EventCollector,
        pool: DispatchPool,
        retry_after: Duration,
    ) -> Self {
        Self {
            daemon,
            collector,
            pool,
            retry_after,
        }
    }

    /// Main loop. Returns when shutdown is requested or the event stream
    /// closes. Shutdown is only observed between cycles.
    pub async fn run(mut self) -> Result<()> {
        info!("watchsync runtime started");
        let mut shutdown = self.daemon.subscribe_shutdown();

        loop {
            if self.daemon.is_shutdown() {
                break;
            }

            // Always wake up when idle: the control endpoint may have queued
            // an initial sync since the last cycle.
            let batch = tokio::select! {
                batch = self.collector.next_batch(Some(self.retry_after)) => batch,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown channel closed");
                    }
                    break;
                }
            };

            let Some(batch) = batch else {
                info!("event stream closed; exiting");
                break;
            };
            if batch.is_empty() && self.daemon.pending_len() == 0 {
                continue;
            }

            self.run_cycle(batch).await;
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Process one batch end to end.
    pub async fn run_cycle(&self, batch: Batch) -> CycleSummary {
        let start = Instant::now();
        info!(events = batch.len(), "start cycle");

        let accepted = filter_batch(&batch, self.daemon.policy());
        let jobs = {
            let mut guard = self.daemon.state().lock();
            let state = &mut *guard;
            resolve_jobs(accepted, &mut state.pending, &state.registry)
        };
        let job_count = jobs.len();

        let reports = self.pool.run(jobs).await;

        let (succeeded, failed, pending) = {
            let mut state = self.daemon.state().lock();
            let (ok, failed) = state.pending.apply_reports(&reports);
            (ok, failed, state.pending.len())
        };

        let summary = CycleSummary {
            events: batch.len(),
            jobs: job_count,
            succeeded,
            failed,
            pending,
        };
        info!(?summary, duration = ?start.elapsed(), "finish cycle");
        summary
    }
}
