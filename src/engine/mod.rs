// src/engine/mod.rs

//! Orchestration engine for watchsync.
//!
//! This module ties together:
//! - the daemon's shared state (watch registry + pending jobs) in [`core`]
//! - the retry backlog of jobs in [`queue`]
//! - batch → job reduction in [`reducer`]
//! - the control-side operations (watch / unwatch / list / restore) in
//!   [`daemon`]
//! - the notification loop that drives collector → reducer → pool in
//!   [`runtime`]

use std::path::PathBuf;

use crate::registry::RemoteLocation;

/// One file to transfer or delete, with its destination resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub local: PathBuf,
    pub remote: RemoteLocation,
    pub is_remove: bool,
    /// Error of the previous attempt, if this is a retry.
    pub last_error: Option<String>,
    /// Revision of the pending entry this job was built from.
    pub(crate) revision: u64,
}

/// Outcome of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: SyncJob,
    pub outcome: JobOutcome,
}

pub mod core;
pub mod daemon;
pub mod queue;
pub mod reducer;
pub mod runtime;

pub use self::core::{DaemonState, SharedState};
pub use daemon::Daemon;
pub use queue::{PendingJob, PendingJobs};
pub use reducer::{filter_batch, reduce, resolve_jobs};
pub use runtime::{CycleSummary, Runtime};
