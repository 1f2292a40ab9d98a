// src/exec/backend.rs

//! Pluggable transfer backend abstraction.
//!
//! The dispatch pool and the daemon talk to a `TransferBackend` instead of
//! spawning processes directly. Production uses [`RsyncBackend`]; tests swap
//! in a fake that records invocations and fails on demand.
//!
//! [`RsyncBackend`]: super::rsync::RsyncBackend

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;
use crate::registry::RemoteLocation;

pub type TransferFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// The three external operations the daemon needs.
///
/// Implementations are opaque: success or an error, no retries of their own.
pub trait TransferBackend: Send + Sync {
    /// Copy `local` to `remote` (one way).
    fn transfer<'a>(&'a self, local: &'a Path, remote: &'a RemoteLocation) -> TransferFuture<'a>;

    /// Delete `remote`.
    fn remove<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a>;

    /// Make sure the remote directory `remote` exists.
    fn ensure_dir<'a>(&'a self, remote: &'a RemoteLocation) -> TransferFuture<'a>;
}
