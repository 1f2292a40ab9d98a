// src/engine/queue.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{JobReport, JobOutcome};

/// A file that still needs to reach the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub is_remove: bool,
    pub last_error: Option<String>,
    /// Arrival order of the first event for this path.
    seq: u64,
    /// Bumped on every upsert so stale completions can be told apart.
    revision: u64,
}

impl PendingJob {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Per-path retry backlog.
///
/// Semantics:
/// - At most one entry per local path. A later event for the same path
///   overwrites `is_remove` (last event wins) but keeps the original arrival
///   position, so dispatch order follows first arrival.
/// - Entries leave the backlog only when a transfer for their *current*
///   revision succeeds, or when their directory is no longer watched.
/// - Failed entries stay forever; every cycle retries them.
#[derive(Debug, Default)]
pub struct PendingJobs {
    jobs: HashMap<PathBuf, PendingJob>,
    next_seq: u64,
    next_revision: u64,
}

impl PendingJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&PendingJob> {
        self.jobs.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.jobs.contains_key(path)
    }

    /// Record that `path` changed.
    pub fn upsert(&mut self, path: PathBuf, is_remove: bool) {
        self.next_revision += 1;
        let revision = self.next_revision;

        match self.jobs.get_mut(&path) {
            Some(job) => {
                debug!(?path, was_remove = job.is_remove, is_remove, "coalesced into pending job");
                job.is_remove = is_remove;
                job.last_error = None;
                job.revision = revision;
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                debug!(?path, is_remove, seq, "new pending job");
                self.jobs.insert(
                    path,
                    PendingJob {
                        is_remove,
                        last_error: None,
                        seq,
                        revision,
                    },
                );
            }
        }
    }

    pub fn remove(&mut self, path: &Path) -> Option<PendingJob> {
        self.jobs.remove(path)
    }

    /// Snapshot of all entries, ordered by first arrival.
    pub fn ordered(&self) -> Vec<(PathBuf, PendingJob)> {
        let mut out: Vec<(PathBuf, PendingJob)> = self
            .jobs
            .iter()
            .map(|(p, j)| (p.clone(), j.clone()))
            .collect();
        out.sort_by_key(|(_, j)| j.seq);
        out
    }

    /// Fold a cycle's outcomes back into the backlog.
    ///
    /// Returns `(succeeded, failed)` counts. A report for an entry that was
    /// upserted again while its job ran is ignored: the newer change still
    /// has to go out.
    pub fn apply_reports(&mut self, reports: &[JobReport]) -> (usize, usize) {
        let mut succeeded = 0;
        let mut failed = 0;

        for report in reports {
            let path = &report.job.local;
            let current = match self.jobs.get_mut(path) {
                Some(j) if j.revision == report.job.revision => j,
                Some(_) => {
                    debug!(?path, "pending job changed while running; keeping it");
                    continue;
                }
                None => continue,
            };

            match &report.outcome {
                JobOutcome::Success => {
                    succeeded += 1;
                    self.jobs.remove(path);
                }
                JobOutcome::Failed(err) => {
                    failed += 1;
                    warn!(?path, error = %err, "job failed; will retry next cycle");
                    current.last_error = Some(err.clone());
                }
            }
        }

        (succeeded, failed)
    }
}
