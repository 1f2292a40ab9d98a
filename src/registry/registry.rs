// src/registry/registry.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, SyncError};
use crate::registry::model::{RemoteLocation, WatchedDir};
use crate::watch::path_utils::{clean_path, dir_display};

/// Mapping of watched local directories to their remote destinations.
///
/// Invariant: no two entries share a local directory or a remote
/// destination. Every mutation either succeeds completely or leaves the
/// registry untouched.
#[derive(Debug, Clone, Default)]
pub struct WatchRegistry {
    dirs: BTreeMap<PathBuf, RemoteLocation>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, local: &Path) -> bool {
        self.dirs.contains_key(&clean_path(local))
    }

    /// Fail if `wd` collides with an existing entry on either side.
    pub fn check_conflict(&self, wd: &WatchedDir) -> Result<()> {
        for (local, remote) in self.dirs.iter() {
            if *local == wd.local || *remote == wd.remote {
                return Err(SyncError::AlreadyWatched {
                    local: dir_display(local),
                    remote: remote.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn add(&mut self, wd: WatchedDir) -> Result<()> {
        self.check_conflict(&wd)?;
        debug!(local = %wd.local_display(), remote = %wd.remote, "registry add");
        self.dirs.insert(wd.local, wd.remote);
        Ok(())
    }

    pub fn remove(&mut self, local: &Path) -> Result<WatchedDir> {
        let local = clean_path(local);
        match self.dirs.remove(&local) {
            Some(remote) => {
                debug!(local = %dir_display(&local), %remote, "registry remove");
                Ok(WatchedDir { local, remote })
            }
            None => Err(SyncError::NotWatched(dir_display(&local))),
        }
    }

    /// Sorted copy of all entries.
    pub fn list(&self) -> Vec<WatchedDir> {
        self.dirs
            .iter()
            .map(|(local, remote)| WatchedDir {
                local: local.clone(),
                remote: remote.clone(),
            })
            .collect()
    }

    /// Remote location for a file directly inside a watched directory.
    pub fn resolve(&self, file: &Path) -> Option<RemoteLocation> {
        let dir = file.parent()?;
        let name = file.file_name()?.to_str()?;
        self.dirs.get(dir).map(|remote| remote.join_file(name))
    }
}
