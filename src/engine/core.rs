// src/engine/core.rs

//! Shared daemon state.
//!
//! Everything both the notification loop and the control endpoint touch
//! lives in one [`DaemonState`] behind one mutex. Critical sections are short
//! and never span an `.await`; transfers run with the lock released.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::queue::PendingJobs;
use crate::registry::WatchRegistry;
use crate::watch::WatchSource;

pub struct DaemonState {
    pub registry: WatchRegistry,
    pub pending: PendingJobs,
    pub source: Box<dyn WatchSource>,
}

impl fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonState")
            .field("registry", &self.registry)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl DaemonState {
    pub fn new(source: Box<dyn WatchSource>) -> Self {
        Self {
            registry: WatchRegistry::new(),
            pending: PendingJobs::new(),
            source,
        }
    }
}

/// Handle to the single daemon lock.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<DaemonState>>,
}

impl SharedState {
    pub fn new(state: DaemonState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Acquire the lock, recovering it if a previous holder panicked.
    pub fn lock(&self) -> MutexGuard<'_, DaemonState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
