// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [daemon]
/// socket = "/home/me/.cache/watchsync.sock"
/// parallel = 10
/// delay = "2s"
/// quiet = "500ms"
/// guess_text = false
/// rsync = "rsync"
/// ssh = "ssh"
///
/// [ignore]
/// extensions = ["o", "so", "exe", "dylib", "test", "out"]
/// patterns = ["**/node_modules/**"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default)]
    pub ignore: IgnoreSection,
}

/// `[daemon]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    /// Unix socket the control endpoint listens on.
    ///
    /// Default: `$HOME/.cache/watchsync.sock`.
    #[serde(default)]
    pub socket: Option<PathBuf>,

    /// Snapshot of the watch registry.
    ///
    /// Default: `$HOME/.cache/watchsync/watched.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Number of transfers run concurrently.
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Upper bound of a debounce window, measured from its first event.
    #[serde(default = "default_delay")]
    pub delay: String,

    /// A window closes early once no interesting event arrived for this long.
    #[serde(default = "default_quiet")]
    pub quiet: String,

    /// Only synchronize files whose first bytes look like UTF-8 text.
    #[serde(default)]
    pub guess_text: bool,

    /// How many bytes `guess_text` inspects.
    #[serde(default = "default_text_probe_bytes")]
    pub text_probe_bytes: usize,

    /// Program used for transfers.
    #[serde(default = "default_rsync")]
    pub rsync: String,

    /// Program used for remote deletes and `mkdir`, and as rsync's `-e`.
    #[serde(default = "default_ssh")]
    pub ssh: String,
}

fn default_parallel() -> usize {
    10
}

fn default_delay() -> String {
    "2s".to_string()
}

fn default_quiet() -> String {
    "500ms".to_string()
}

fn default_text_probe_bytes() -> usize {
    8192
}

fn default_rsync() -> String {
    "rsync".to_string()
}

fn default_ssh() -> String {
    "ssh".to_string()
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            socket: None,
            state_file: None,
            parallel: default_parallel(),
            delay: default_delay(),
            quiet: default_quiet(),
            guess_text: false,
            text_probe_bytes: default_text_probe_bytes(),
            rsync: default_rsync(),
            ssh: default_ssh(),
        }
    }
}

/// `[ignore]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IgnoreSection {
    /// File extensions (without the dot, case-insensitive) never synchronized.
    #[serde(default = "default_ignored_extensions")]
    pub extensions: Vec<String>,

    /// Extra glob patterns matched against the full path.
    #[serde(default)]
    pub patterns: Vec<String>,
}

pub fn default_ignored_extensions() -> Vec<String> {
    ["o", "so", "exe", "dylib", "test", "out"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for IgnoreSection {
    fn default() -> Self {
        Self {
            extensions: default_ignored_extensions(),
            patterns: Vec::new(),
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub daemon: DaemonConfig,
    pub ignore: IgnoreSection,
}

/// `[daemon]` after defaults are resolved and durations parsed.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket: PathBuf,
    pub state_file: PathBuf,
    pub parallel: usize,
    pub delay: Duration,
    pub quiet: Duration,
    pub guess_text: bool,
    pub text_probe_bytes: usize,
    pub rsync: String,
    pub ssh: String,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(daemon: DaemonConfig, ignore: IgnoreSection) -> Self {
        Self { daemon, ignore }
    }
}

fn home_or_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_socket_path() -> PathBuf {
    home_or_cwd().join(".cache").join("watchsync.sock")
}

pub fn default_state_file() -> PathBuf {
    home_or_cwd()
        .join(".cache")
        .join("watchsync")
        .join("watched.json")
}
