// src/engine/daemon.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::engine::core::{DaemonState, SharedState};
use crate::errors::Result;
use crate::exec::TransferBackend;
use crate::fs::{FileKind, FileSystem};
use crate::registry::{SnapshotStore, WatchedDir};
use crate::watch::{IgnorePolicy, WatchSource};

/// Result of re-registering the snapshot at startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: Vec<WatchedDir>,
    pub skipped: Vec<(String, String)>,
}

/// Cheaply cloneable handle shared by the notification loop and the control
/// endpoint.
#[derive(Clone)]
pub struct Daemon {
    state: SharedState,
    backend: Arc<dyn TransferBackend>,
    fs: Arc<dyn FileSystem>,
    policy: Arc<IgnorePolicy>,
    snapshot: SnapshotStore,
    home: Option<PathBuf>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("state", &self.state)
            .field("snapshot", &self.snapshot.path())
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn new(
        source: Box<dyn WatchSource>,
        backend: Arc<dyn TransferBackend>,
        fs: Arc<dyn FileSystem>,
        policy: Arc<IgnorePolicy>,
        snapshot: SnapshotStore,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: SharedState::new(DaemonState::new(source)),
            backend,
            fs,
            policy,
            snapshot,
            home: dirs::home_dir(),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Override the directory `host:=` remotes are resolved against.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn policy(&self) -> &Arc<IgnorePolicy> {
        &self.policy
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Start mirroring `local` to `remote_spec`.
    ///
    /// The lock is released while the remote directory is provisioned, so
    /// conflicts are checked both before and after.
    pub async fn watch(&self, local: &Path, remote_spec: &str) -> Result<WatchedDir> {
        let wd = WatchedDir::validate_with_home(
            local,
            remote_spec,
            self.fs.as_ref(),
            self.home.as_deref(),
        )?;
        self.state.lock().registry.check_conflict(&wd)?;

        if let Err(err) = self.backend.ensure_dir(&wd.remote).await {
            warn!(remote = %wd.remote, error = %err, "could not provision remote dir");
        }

        let initial = self.initial_files(&wd.local);
        self.register(wd.clone(), initial, true)?;
        info!(local = %wd.local_display(), remote = %wd.remote, "watching");
        Ok(wd)
    }

    /// Stop mirroring `local`.
    pub fn unwatch(&self, local: &Path) -> Result<WatchedDir> {
        let mut state = self.state.lock();
        let wd = state.registry.remove(local)?;
        if let Err(err) = state.source.unwatch(&wd.local) {
            warn!(local = %wd.local_display(), error = %err, "unwatch failed");
        }
        if let Err(err) = self.snapshot.save(&state.registry) {
            state.registry.add(wd.clone())?;
            if let Err(e) = state.source.watch(&wd.local) {
                warn!(local = %wd.local_display(), error = %e, "re-watch after failed save");
            }
            return Err(err);
        }
        info!(local = %wd.local_display(), remote = %wd.remote, "unwatched");
        Ok(wd)
    }

    pub fn list(&self) -> Vec<WatchedDir> {
        self.state.lock().registry.list()
    }

    /// Re-register every directory from the snapshot.
    ///
    /// Entries that no longer validate (directory gone, malformed remote,
    /// duplicates) are skipped with a warning. The cleaned registry is saved.
    pub async fn restore(&self) -> Result<RestoreSummary> {
        let entries = self.snapshot.load()?;
        let mut summary = RestoreSummary::default();

        for (local, remote) in entries {
            let restored = async {
                let wd = WatchedDir::validate_with_home(
                    Path::new(&local),
                    &remote,
                    self.fs.as_ref(),
                    self.home.as_deref(),
                )?;
                self.state.lock().registry.check_conflict(&wd)?;
                if let Err(err) = self.backend.ensure_dir(&wd.remote).await {
                    warn!(remote = %wd.remote, error = %err, "could not provision remote dir");
                }
                let initial = self.initial_files(&wd.local);
                self.register(wd.clone(), initial, false)?;
                Ok::<_, crate::errors::SyncError>(wd)
            }
            .await;

            match restored {
                Ok(wd) => {
                    info!(%wd, "restored watch");
                    summary.restored.push(wd);
                }
                Err(err) => {
                    warn!(%local, %remote, error = %err, "dropping watch from snapshot");
                    summary.skipped.push((local, err.to_string()));
                }
            }
        }

        let state = self.state.lock();
        self.snapshot.save(&state.registry)?;
        Ok(summary)
    }

    pub fn request_shutdown(&self) {
        info!("shutdown requested");
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Regular, non-ignored files directly inside `dir`, for the initial sync.
    fn initial_files(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match self.fs.read_dir(dir) {
            Ok(e) => e,
            Err(err) => {
                warn!(?dir, error = %err, "cannot list dir for initial sync");
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .filter(|p| matches!(self.fs.kind(p), Ok(FileKind::File)))
            .filter(|p| !self.policy.should_ignore(p))
            .collect()
    }

    /// Insert, start watching, seed the initial sync and optionally persist,
    /// all under one lock. Any failure rolls the registry back.
    fn register(&self, wd: WatchedDir, initial: Vec<PathBuf>, persist: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.registry.add(wd.clone())?;

        if let Err(err) = state.source.watch(&wd.local) {
            let _ = state.registry.remove(&wd.local);
            return Err(err);
        }

        if persist {
            if let Err(err) = self.snapshot.save(&state.registry) {
                let _ = state.registry.remove(&wd.local);
                let _ = state.source.unwatch(&wd.local);
                return Err(err);
            }
        }

        let seeded = initial.len();
        for path in initial {
            state.pending.upsert(path, false);
        }
        info!(local = %wd.local_display(), files = seeded, "queued initial sync");
        Ok(())
    }
}
