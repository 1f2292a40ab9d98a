// src/registry/mod.rs

//! Watch registry: which local directories are mirrored where.
//!
//! - [`model`] defines `WatchedDir` / `RemoteLocation` and their validation.
//! - [`registry`] holds the conflict-free `local → remote` mapping.
//! - [`snapshot`] persists the mapping so a restarted daemon recovers it.

pub mod model;
#[allow(clippy::module_inception)]
pub mod registry;
pub mod snapshot;

pub use model::{RemoteLocation, WatchedDir, MIRROR_HOME_PATH};
pub use registry::WatchRegistry;
pub use snapshot::{SnapshotEntries, SnapshotStore};
