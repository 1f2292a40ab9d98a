// src/exec/mod.rs

//! Transfer execution layer.
//!
//! - [`backend`] provides the `TransferBackend` trait that the pool and the
//!   daemon use; tests replace it with a fake.
//! - [`rsync`] is the production backend, shelling out to `rsync` and `ssh`
//!   via `tokio::process::Command`.
//! - [`pool`] fans a cycle's jobs out to a fixed number of workers and joins
//!   them, collecting one report per job.

pub mod backend;
pub mod pool;
pub mod rsync;

pub use backend::{TransferBackend, TransferFuture};
pub use pool::DispatchPool;
pub use rsync::RsyncBackend;
