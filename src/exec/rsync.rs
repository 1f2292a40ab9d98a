// src/exec/rsync.rs

//! `rsync`/`ssh` transfer backend.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::DaemonConfig;
use crate::errors::{Result, SyncError};
use crate::exec::backend::{TransferBackend, TransferFuture};
use crate::registry::RemoteLocation;

/// Runs `rsync -a -e ssh` for transfers and `ssh <host> ...` for remote
/// deletes and directory provisioning.
#[derive(Debug, Clone)]
pub struct RsyncBackend {
    rsync: String,
    ssh: String,
}

impl Default for RsyncBackend {
    fn default() -> Self {
        Self::new("rsync", "ssh")
    }
}

impl RsyncBackend {
    pub fn new(rsync: impl Into<String>, ssh: impl Into<String>) -> Self {
        Self {
            rsync: rsync.into(),
            ssh: ssh.into(),
        }
    }

    pub fn from_config(cfg: &DaemonConfig) -> Self {
        Self::new(cfg.rsync.clone(), cfg.ssh.clone())
    }

    pub fn transfer_args(&self, local: &Path, remote: &RemoteLocation) -> Vec<String> {
        vec![
            "-a".to_string(),
            "-e".to_string(),
            self.ssh.clone(),
            local.to_string_lossy().into_owned(),
            remote.to_string(),
        ]
    }

    /// `rm -f` so that deleting a file that never reached the remote (created
    /// and removed within one window) succeeds instead of failing forever.
    pub fn remove_args(&self, remote: &RemoteLocation) -> Vec<String> {
        vec![
            remote.host().to_string(),
            "rm".to_string(),
            "-f".to_string(),
            "--".to_string(),
            shell_quote(remote.path()),
        ]
    }

    pub fn ensure_dir_args(&self, remote: &RemoteLocation) -> Vec<String> {
        vec![
            remote.host().to_string(),
            "mkdir".to_string(),
            "-p".to_string(),
            "--".to_string(),
            shell_quote(remote.path()),
        ]
    }
}

impl TransferBackend for RsyncBackend {
    fn transfer<'a>(&'a self, local: &'a Path, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            info!(src = ?local, dst = %remote, "rsync");
            run_tool(&self.rsync, &self.transfer_args(local, remote)).await
        })
    }

    fn remove<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            info!(host = remote.host(), file = remote.path(), "ssh rm");
            run_tool(&self.ssh, &self.remove_args(remote)).await
        })
    }

    fn ensure_dir<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a> {
        Box::pin(async move {
            info!(host = remote.host(), dir = remote.path(), "ssh mkdir");
            run_tool(&self.ssh, &self.ensure_dir_args(remote)).await
        })
    }
}

/// Run `program args..` to completion.
///
/// stdout is discarded, stderr is logged at debug and its last line is
/// included in the error on a non-zero exit.
async fn run_tool(program: &str, args: &[String]) -> Result<()> {
    debug!(program, ?args, "spawning transfer tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| SyncError::Transfer(format!("spawning {program}: {e}")))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(program, "stderr: {}", line);
    }

    if output.status.success() {
        return Ok(());
    }

    let code = output.status.code().unwrap_or(-1);
    let detail = stderr.lines().last().unwrap_or("").trim();
    Err(SyncError::Transfer(if detail.is_empty() {
        format!("{program} exited with code {code}")
    } else {
        format!("{program} exited with code {code}: {detail}")
    }))
}

/// Quote `s` for the remote shell `ssh` hands its arguments to.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
