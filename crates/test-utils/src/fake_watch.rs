use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use watchsync::errors::Result;
use watchsync::watch::WatchSource;

/// A watch source that only remembers which directories are watched.
///
/// Clones share state, so a test can keep one handle and give the daemon
/// another.
#[derive(Debug, Clone, Default)]
pub struct FakeWatchSource {
    watched: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeWatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }
}

impl WatchSource for FakeWatchSource {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.watched.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<()> {
        self.watched.lock().unwrap().retain(|d| d != dir);
        Ok(())
    }
}
