// src/engine/reducer.rs

//! Turn a batch of raw events into ready-to-run jobs.
//!
//! Reduction happens in two phases so that filesystem inspection (the ignore
//! policy stats and may read files) runs without the daemon lock:
//!
//! 1. [`filter_batch`] drops ignored events and yields `(path, is_remove)`
//!    in arrival order.
//! 2. [`resolve_jobs`], under the lock, upserts those into the pending
//!    backlog (last event per path wins) and resolves every pending entry
//!    against the registry. Entries whose directory is no longer watched are
//!    dropped for good.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::engine::queue::PendingJobs;
use crate::engine::SyncJob;
use crate::registry::WatchRegistry;
use crate::types::Batch;
use crate::watch::IgnorePolicy;

/// An event that survived the ignore policy.
pub type AcceptedChange = (PathBuf, bool);

pub fn filter_batch(batch: &Batch, policy: &IgnorePolicy) -> Vec<AcceptedChange> {
    let mut accepted = Vec::with_capacity(batch.len());
    for ev in batch.iter() {
        if !ev.kind.is_interesting() {
            continue;
        }
        if let Some(reason) = policy.check_event(&ev.path, ev.kind) {
            debug!(path = ?ev.path, %reason, "ignore");
            continue;
        }
        debug!(path = ?ev.path, kind = %ev.kind, "accept");
        accepted.push((ev.path.clone(), ev.kind.is_remove()));
    }
    accepted
}

pub fn resolve_jobs(
    accepted: Vec<AcceptedChange>,
    pending: &mut PendingJobs,
    registry: &WatchRegistry,
) -> Vec<SyncJob> {
    for (path, is_remove) in accepted {
        pending.upsert(path, is_remove);
    }

    let mut jobs = Vec::with_capacity(pending.len());
    for (path, entry) in pending.ordered() {
        match registry.resolve(&path) {
            Some(remote) => {
                let revision = entry.revision();
                jobs.push(SyncJob {
                    local: path,
                    remote,
                    is_remove: entry.is_remove,
                    last_error: entry.last_error,
                    revision,
                })
            }
            None => {
                info!(?path, "no watch covers this file anymore; dropping job");
                pending.remove(&path);
            }
        }
    }
    jobs
}

/// Both phases in one call.
pub fn reduce(
    batch: &Batch,
    pending: &mut PendingJobs,
    registry: &WatchRegistry,
    policy: &IgnorePolicy,
) -> Vec<SyncJob> {
    let accepted = filter_batch(batch, policy);
    resolve_jobs(accepted, pending, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use crate::config::IgnoreSection;
    use crate::fs::mock::MockFileSystem;
    use crate::registry::WatchedDir;
    use crate::types::{EventKind, RawEvent};

    struct Fixture {
        fs: MockFileSystem,
        registry: WatchRegistry,
        policy: IgnorePolicy,
    }

    fn fixture() -> Fixture {
        let fs = MockFileSystem::new();
        fs.add_dir("/data/app");
        let mut registry = WatchRegistry::new();
        registry
            .add(
                WatchedDir::validate_with_home(
                    Path::new("/data/app"),
                    "host1:backups/app",
                    &fs,
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        let policy =
            IgnorePolicy::new(Arc::new(fs.clone()), &IgnoreSection::default(), None).unwrap();
        Fixture {
            fs,
            registry,
            policy,
        }
    }

    #[test]
    fn created_file_becomes_transfer_job() {
        let f = fixture();
        f.fs.add_file("/data/app/x.txt", "x");
        let mut pending = PendingJobs::new();

        let batch = vec![RawEvent::new("/data/app/x.txt", EventKind::Created)];
        let jobs = reduce(&batch, &mut pending, &f.registry, &f.policy);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].local, PathBuf::from("/data/app/x.txt"));
        assert_eq!(jobs[0].remote.to_string(), "host1:backups/app/x.txt");
        assert!(!jobs[0].is_remove);
    }

    #[test]
    fn repeated_writes_collapse_and_last_kind_wins() {
        let f = fixture();
        let mut pending = PendingJobs::new();

        let batch = vec![
            RawEvent::new("/data/app/y.txt", EventKind::Created),
            RawEvent::new("/data/app/y.txt", EventKind::Modified),
            RawEvent::new("/data/app/y.txt", EventKind::Removed),
        ];
        let jobs = reduce(&batch, &mut pending, &f.registry, &f.policy);

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].is_remove);
    }

    #[test]
    fn ignored_paths_never_become_jobs() {
        let f = fixture();
        f.fs.add_file("/data/app/.x.swp", "");
        f.fs.add_file("/data/app/a.o", "");
        f.fs.add_dir("/data/app/sub");
        let mut pending = PendingJobs::new();

        let batch = vec![
            RawEvent::new("/data/app/.x.swp", EventKind::Modified),
            RawEvent::new("/data/app/a.o", EventKind::Created),
            RawEvent::new("/data/app/sub", EventKind::Created),
            RawEvent::new("/data/app/x.txt~", EventKind::Removed),
        ];
        let jobs = reduce(&batch, &mut pending, &f.registry, &f.policy);

        assert!(jobs.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn unwatched_directory_drops_pending_job() {
        let mut f = fixture();
        f.fs.add_file("/data/app/x.txt", "x");
        let mut pending = PendingJobs::new();
        pending.upsert(PathBuf::from("/data/app/x.txt"), false);
        pending.upsert(PathBuf::from("/data/other/z.txt"), false);

        f.registry.remove(Path::new("/data/app")).unwrap();
        let jobs = reduce(&Batch::new(), &mut pending, &f.registry, &f.policy);

        assert!(jobs.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn leftover_failures_are_merged_with_new_events() {
        let f = fixture();
        f.fs.add_file("/data/app/new.txt", "n");
        let mut pending = PendingJobs::new();
        pending.upsert(PathBuf::from("/data/app/old.txt"), false);

        let batch = vec![RawEvent::new("/data/app/new.txt", EventKind::Created)];
        let jobs = reduce(&batch, &mut pending, &f.registry, &f.policy);

        let names: Vec<_> = jobs.iter().map(|j| j.local.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/data/app/old.txt"),
                PathBuf::from("/data/app/new.txt")
            ]
        );
    }

    #[test]
    fn retried_job_carries_last_error_and_revision() {
        let f = fixture();
        let mut pending = PendingJobs::new();
        pending.upsert(PathBuf::from("/data/app/z.txt"), false);
        let revision = pending.get(Path::new("/data/app/z.txt")).unwrap().revision();

        let first = resolve_jobs(Vec::new(), &mut pending, &f.registry);
        let report = crate::engine::JobReport {
            job: first[0].clone(),
            outcome: crate::engine::JobOutcome::Failed("timeout".to_string()),
        };
        pending.apply_reports(&[report]);

        let retry = resolve_jobs(Vec::new(), &mut pending, &f.registry);
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].last_error.as_deref(), Some("timeout"));
        assert_eq!(retry[0].revision, revision);
    }

    #[test]
    fn removed_subdirectory_never_becomes_job() {
        let f = fixture();
        let mut pending = PendingJobs::new();
        let event = notify::Event::new(notify::EventKind::Remove(
            notify::event::RemoveKind::Folder,
        ))
        .add_path(PathBuf::from("/data/app/sub"));

        let batch = crate::watch::translate_event(&event);
        let jobs = reduce(&batch, &mut pending, &f.registry, &f.policy);

        assert!(jobs.is_empty());
        assert!(pending.is_empty());
    }
}
