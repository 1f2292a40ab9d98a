// src/exec/pool.rs

//! Fixed-size worker pool that runs one cycle's jobs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::engine::{JobOutcome, JobReport, SyncJob};
use crate::exec::backend::TransferBackend;

/// Runs jobs against a [`TransferBackend`] with at most `parallelism`
/// invocations in flight.
///
/// Every job gets its own report; a failing job never cancels or delays its
/// siblings. [`DispatchPool::run`] returns only once the queue is drained and
/// every worker has finished.
#[derive(Clone)]
pub struct DispatchPool {
    parallelism: usize,
    backend: Arc<dyn TransferBackend>,
}

impl std::fmt::Debug for DispatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPool")
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl DispatchPool {
    /// `parallelism` is clamped to at least 1.
    pub fn new(parallelism: usize, backend: Arc<dyn TransferBackend>) -> Self {
        Self {
            parallelism: parallelism.max(1),
            backend,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub async fn run(&self, jobs: Vec<SyncJob>) -> Vec<JobReport> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        let workers = self.parallelism.min(total);
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        debug!(total, workers, "dispatching jobs");

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let backend = Arc::clone(&self.backend);
            set.spawn(async move {
                let mut reports = Vec::new();
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .pop_front();
                    let Some(job) = next else { break };
                    let outcome = run_job(backend.as_ref(), &job).await;
                    reports.push(JobReport { job, outcome });
                }
                debug!(worker, done = reports.len(), "worker drained queue");
                reports
            });
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(batch) => reports.extend(batch),
                // The lost jobs stay pending and are retried next cycle.
                Err(err) => error!(error = %err, "dispatch worker panicked"),
            }
        }
        reports
    }
}

async fn run_job(backend: &dyn TransferBackend, job: &SyncJob) -> JobOutcome {
    let start = Instant::now();
    let res = if job.is_remove {
        backend.remove(&job.remote).await
    } else {
        backend.transfer(&job.local, &job.remote).await
    };

    match res {
        Ok(()) => {
            info!(
                file = ?job.local,
                remote = %job.remote,
                rm = job.is_remove,
                duration = ?start.elapsed(),
                "job done"
            );
            JobOutcome::Success
        }
        Err(err) => JobOutcome::Failed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::errors::SyncError;
    use crate::exec::backend::TransferFuture;
    use crate::registry::RemoteLocation;

    /// Sleeps per call, tracks peak concurrency, fails paths containing "bad".
    #[derive(Default)]
    struct SlowBackend {
        running: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    impl SlowBackend {
        fn call<'a>(&'a self, what: String) -> TransferFuture<'a> {
            Box::pin(async move {
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                self.running.fetch_sub(1, Ordering::SeqCst);
                let fail = what.contains("bad");
                self.calls.lock().unwrap().push(what);
                if fail {
                    Err(SyncError::Transfer("simulated".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    impl TransferBackend for SlowBackend {
        fn transfer<'a>(&'a self, _local: &'a Path, remote: &'a RemoteLocation) -> TransferFuture<'a> {
            self.call(format!("transfer {remote}"))
        }
        fn remove<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
            self.call(format!("remove {remote}"))
        }
        fn ensure_dir<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
            self.call(format!("mkdir {remote}"))
        }
    }

    fn job(name: &str, is_remove: bool) -> SyncJob {
        SyncJob {
            local: PathBuf::from(format!("/data/app/{name}")),
            remote: RemoteLocation::parse(&format!("host1:backups/app/{name}")).unwrap(),
            is_remove,
            last_error: None,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn runs_every_job_with_bounded_concurrency() {
        let backend = Arc::new(SlowBackend::default());
        let pool = DispatchPool::new(3, backend.clone());

        let jobs: Vec<_> = (0..10).map(|i| job(&format!("f{i}"), false)).collect();
        let reports = pool.run(jobs).await;

        assert_eq!(reports.len(), 10);
        assert!(reports.iter().all(|r| r.outcome.is_success()));
        assert_eq!(backend.calls.lock().unwrap().len(), 10);
        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak <= 3 && peak >= 2, "peak concurrency {peak}");
    }

    #[tokio::test]
    async fn failure_does_not_stop_siblings() {
        let backend = Arc::new(SlowBackend::default());
        let pool = DispatchPool::new(1, backend.clone());

        let reports = pool
            .run(vec![job("bad.txt", false), job("a.txt", false), job("b.txt", true)])
            .await;

        assert_eq!(reports.len(), 3);
        let failed: Vec<_> = reports
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.job.local.clone())
            .collect();
        assert_eq!(failed, vec![PathBuf::from("/data/app/bad.txt")]);

        let calls = backend.calls.lock().unwrap().clone();
        assert!(calls.contains(&"remove host1:backups/app/b.txt".to_string()));
    }

    #[tokio::test]
    async fn empty_input_runs_nothing() {
        let backend = Arc::new(SlowBackend::default());
        let pool = DispatchPool::new(0, backend.clone());
        assert_eq!(pool.parallelism(), 1);
        assert!(pool.run(Vec::new()).await.is_empty());
    }
}
