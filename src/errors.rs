// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Malformed local/remote argument or a directory that cannot be watched.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("already watching {local} => {remote}")]
    AlreadyWatched { local: String, remote: String },

    #[error("not watching {0}")]
    NotWatched(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Malformed request or response on the control channel.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The external transfer tool failed.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SyncError>;
