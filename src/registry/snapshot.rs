// src/registry/snapshot.rs

//! Durable snapshot of the watch registry.
//!
//! The file is a JSON object mapping each local directory (with trailing
//! separator) to its `host:path/` destination:
//!
//! ```json
//! { "/data/app/": "host1:backups/app/" }
//! ```
//!
//! It is rewritten atomically after every registry mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::registry::registry::WatchRegistry;

/// Raw persisted entries; values are re-validated before use.
pub type SnapshotEntries = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file means "first run": an empty snapshot
    /// is written and returned.
    pub fn load(&self) -> Result<SnapshotEntries> {
        if !self.fs.exists(&self.path) {
            info!(path = ?self.path, "no registry snapshot; starting empty");
            self.write(&SnapshotEntries::new())?;
            return Ok(SnapshotEntries::new());
        }
        let contents = self.fs.read_to_string(&self.path)?;
        let entries: SnapshotEntries = serde_json::from_str(&contents)?;
        Ok(entries)
    }

    pub fn save(&self, registry: &WatchRegistry) -> Result<()> {
        let entries: SnapshotEntries = registry
            .list()
            .into_iter()
            .map(|wd| (wd.local_display(), wd.remote.to_string()))
            .collect();
        self.write(&entries)?;
        info!(path = ?self.path, entries = entries.len(), "saved registry snapshot");
        Ok(())
    }

    fn write(&self, entries: &SnapshotEntries) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(entries)?;
        json.push(b'\n');
        self.fs.write_atomic(&self.path, &json)?;
        Ok(())
    }
}
