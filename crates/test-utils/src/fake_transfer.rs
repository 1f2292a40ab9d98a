use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use watchsync::errors::SyncError;
use watchsync::exec::{TransferBackend, TransferFuture};
use watchsync::registry::RemoteLocation;

/// One recorded backend invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferCall {
    Transfer { local: PathBuf, remote: String },
    Remove { remote: String },
    EnsureDir { remote: String },
}

/// A fake transfer backend that:
/// - records every invocation in order
/// - fails transfers/removes whose remote is in the failing set, until healed.
#[derive(Debug, Default)]
pub struct FakeTransfer {
    calls: Mutex<Vec<TransferCall>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call targeting `remote` (e.g. `host1:backups/app/z.txt`) fail.
    pub fn fail(&self, remote: &str) {
        self.failing.lock().unwrap().insert(remote.to_string());
    }

    pub fn heal(&self, remote: &str) {
        self.failing.lock().unwrap().remove(remote);
    }

    pub fn calls(&self) -> Vec<TransferCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Remotes passed to `transfer`, in call order.
    pub fn transferred(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransferCall::Transfer { remote, .. } => Some(remote),
                _ => None,
            })
            .collect()
    }

    /// Remotes passed to `remove`, in call order.
    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransferCall::Remove { remote } => Some(remote),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: TransferCall, remote: &RemoteLocation) -> watchsync::errors::Result<()> {
        self.calls.lock().unwrap().push(call);
        let remote = remote.to_string();
        if self.failing.lock().unwrap().contains(&remote) {
            return Err(SyncError::Transfer(format!("simulated failure for {remote}")));
        }
        Ok(())
    }
}

impl TransferBackend for FakeTransfer {
    fn transfer<'a>(&'a self, local: &'a Path, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            let call = TransferCall::Transfer {
                local: local.to_path_buf(),
                remote: remote.to_string(),
            };
            self.record(call, remote)
        })
    }

    fn remove<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            let call = TransferCall::Remove {
                remote: remote.to_string(),
            };
            self.record(call, remote)
        })
    }

    fn ensure_dir<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            let call = TransferCall::EnsureDir {
                remote: remote.to_string(),
            };
            self.record(call, remote)
        })
    }
}
