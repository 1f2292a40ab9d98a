// src/watch/ignore.rs

//! Decide whether a changed path is noise.
//!
//! Rules are applied in order and the first match wins:
//! 1. a hidden path component (`.git`, `.foo.swp`, ...)
//! 2. editor backups ending in `~`
//! 3. a denylisted extension (case-insensitive), then any extra glob pattern
//! 4. anything that is not a regular file (directories, symlinks)
//! 5. in text-only mode, files whose first bytes are not UTF-8
//!
//! Rules 4 and 5 need to look at the file. A path that cannot be inspected is
//! ignored: by the time we look, the file is usually gone and a removal event
//! for it is already queued.

use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{ConfigFile, IgnoreSection};
use crate::errors::{Result, SyncError};
use crate::fs::{FileKind, FileSystem};
use crate::types::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Hidden,
    Backup,
    Extension,
    Pattern,
    NotRegularFile,
    Unreadable,
    NotText,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IgnoreReason::Hidden => "hidden",
            IgnoreReason::Backup => "backup file",
            IgnoreReason::Extension => "ignored extension",
            IgnoreReason::Pattern => "ignore pattern",
            IgnoreReason::NotRegularFile => "not a regular file",
            IgnoreReason::Unreadable => "cannot stat",
            IgnoreReason::NotText => "not text",
        };
        f.write_str(s)
    }
}

pub struct IgnorePolicy {
    fs: Arc<dyn FileSystem>,
    extensions: Vec<String>,
    patterns: Option<GlobSet>,
    /// `Some(n)` enables text-only mode, inspecting the first `n` bytes.
    text_probe: Option<usize>,
}

impl fmt::Debug for IgnorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnorePolicy")
            .field("extensions", &self.extensions)
            .field("has_patterns", &self.patterns.is_some())
            .field("text_probe", &self.text_probe)
            .finish()
    }
}

impl IgnorePolicy {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        ignore: &IgnoreSection,
        text_probe: Option<usize>,
    ) -> Result<Self> {
        let extensions = ignore
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        let patterns = if ignore.patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in ignore.patterns.iter() {
                let glob = Glob::new(pattern).map_err(|e| {
                    SyncError::ConfigError(format!("invalid ignore glob '{pattern}': {e}"))
                })?;
                builder.add(glob);
            }
            Some(builder.build().map_err(|e| {
                SyncError::ConfigError(format!("building ignore globset: {e}"))
            })?)
        };

        Ok(Self {
            fs,
            extensions,
            patterns,
            text_probe,
        })
    }

    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let probe = cfg
            .daemon
            .guess_text
            .then_some(cfg.daemon.text_probe_bytes);
        Self::new(fs, &cfg.ignore, probe)
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        self.check(path).is_some()
    }

    /// Apply every rule to `path`.
    pub fn check(&self, path: &Path) -> Option<IgnoreReason> {
        self.check_name(path).or_else(|| self.check_content(path))
    }

    /// Apply the rules relevant for an event of `kind`.
    ///
    /// A removed path no longer exists, so only the name-based rules apply.
    pub fn check_event(&self, path: &Path, kind: EventKind) -> Option<IgnoreReason> {
        if kind.is_remove() {
            self.check_name(path)
        } else {
            self.check(path)
        }
    }

    fn check_name(&self, path: &Path) -> Option<IgnoreReason> {
        let hidden = path.components().any(|c| match c {
            Component::Normal(s) => s.to_string_lossy().starts_with('.'),
            _ => false,
        });
        if hidden {
            return Some(IgnoreReason::Hidden);
        }

        if path.to_string_lossy().ends_with('~') {
            return Some(IgnoreReason::Backup);
        }

        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.extensions.iter().any(|e| *e == ext) {
                return Some(IgnoreReason::Extension);
            }
        }

        if let Some(ref set) = self.patterns {
            if set.is_match(path) {
                return Some(IgnoreReason::Pattern);
            }
        }

        None
    }

    fn check_content(&self, path: &Path) -> Option<IgnoreReason> {
        match self.fs.kind(path) {
            Ok(FileKind::File) => {}
            Ok(_) => return Some(IgnoreReason::NotRegularFile),
            Err(_) => return Some(IgnoreReason::Unreadable),
        }

        let limit = self.text_probe?;
        match self.fs.read_prefix(path, limit) {
            Ok(prefix) if looks_like_utf8(&prefix, limit) => None,
            Ok(_) => Some(IgnoreReason::NotText),
            Err(_) => Some(IgnoreReason::Unreadable),
        }
    }
}

/// A multi-byte sequence cut off by the probe limit still counts as text.
fn looks_like_utf8(prefix: &[u8], limit: usize) -> bool {
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && prefix.len() == limit,
    }
}
