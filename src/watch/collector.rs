// src/watch/collector.rs

//! Debounce raw notifications into batches.
//!
//! The collector is a two-state machine:
//!
//! - **Idle**: wait for the first interesting event. Uninteresting events are
//!   read and dropped.
//! - **Collecting**: buffer interesting events until either
//!   - `delay` has elapsed since the first event of the window, or
//!   - `quiet` has elapsed since the last interesting event.
//!
//!   Uninteresting events are dropped here too and never move either timer.
//!
//! Whichever timer fires first flushes the whole buffer, in arrival order,
//! as one [`Batch`] and returns to Idle.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, trace};

use crate::types::{Batch, RawEvent};

/// What ended an Idle wait.
enum Wake {
    Event(RawEvent),
    Retry,
    Closed,
}

#[derive(Debug)]
pub struct EventCollector {
    rx: mpsc::UnboundedReceiver<RawEvent>,
    delay: Duration,
    quiet: Duration,
    closed: bool,
}

impl EventCollector {
    pub fn new(rx: mpsc::UnboundedReceiver<RawEvent>, delay: Duration, quiet: Duration) -> Self {
        Self {
            rx,
            delay,
            quiet,
            closed: false,
        }
    }

    /// Wait for and return the next batch.
    ///
    /// With `retry_after = Some(d)`, an Idle wait that sees no interesting
    /// event for `d` returns an empty batch, so pending retries run without
    /// needing a new filesystem event.
    ///
    /// Returns `None` once the event stream is closed and nothing is left to
    /// flush.
    pub async fn next_batch(&mut self, retry_after: Option<Duration>) -> Option<Batch> {
        if self.closed {
            return None;
        }

        let first = match self.wait_first(retry_after).await {
            Wake::Event(ev) => ev,
            Wake::Retry => {
                debug!("idle timeout; empty batch for retries");
                return Some(Batch::new());
            }
            Wake::Closed => {
                self.closed = true;
                return None;
            }
        };

        Some(self.collect(first).await)
    }

    async fn wait_first(&mut self, retry_after: Option<Duration>) -> Wake {
        let retry = async {
            match retry_after {
                Some(d) => sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(retry);

        loop {
            tokio::select! {
                ev = self.rx.recv() => match ev {
                    Some(ev) if ev.kind.is_interesting() => return Wake::Event(ev),
                    Some(ev) => trace!(?ev, "dropping uninteresting event"),
                    None => return Wake::Closed,
                },
                _ = &mut retry => return Wake::Retry,
            }
        }
    }

    async fn collect(&mut self, first: RawEvent) -> Batch {
        debug!(event = ?first, "start collecting");
        let start = Instant::now();
        let deadline = start + self.delay;
        let mut quiet_deadline = start + self.quiet;
        let mut batch = vec![first];

        loop {
            tokio::select! {
                ev = self.rx.recv() => match ev {
                    Some(ev) if ev.kind.is_interesting() => {
                        trace!(?ev, "recv");
                        batch.push(ev);
                        quiet_deadline = Instant::now() + self.quiet;
                    }
                    Some(ev) => trace!(?ev, "dropping uninteresting event"),
                    None => {
                        debug!("event stream closed while collecting; flushing");
                        self.closed = true;
                        break;
                    }
                },
                _ = sleep_until(deadline) => {
                    debug!("debounce window elapsed");
                    break;
                }
                _ = sleep_until(quiet_deadline) => {
                    debug!("quiet period elapsed");
                    break;
                }
            }
        }

        debug!(events = batch.len(), elapsed = ?start.elapsed(), "flushing batch");
        batch
    }
}
