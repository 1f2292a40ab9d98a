// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `watchsync`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchsync",
    version,
    about = "Mirror local directories to remote hosts as files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Control socket of the daemon.
    ///
    /// Default: `[daemon].socket` from the config, else
    /// `$HOME/.cache/watchsync.sock`.
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Path to the config file (TOML). A missing file means defaults.
    ///
    /// Default: `$HOME/.config/watchsync/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHSYNC_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground.
    Daemon(DaemonArgs),

    /// Start mirroring a local directory.
    Add {
        /// Local directory; relative paths are made absolute.
        local: PathBuf,
        /// `host:path`, or `host:=` for the same path relative to $HOME.
        remote: String,
    },

    /// Stop mirroring a local directory.
    Remove { local: PathBuf },

    /// List mirrored directories.
    List,

    /// Ask the daemon to exit.
    Quit,
}

/// Overrides for the `[daemon]` config section.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DaemonArgs {
    /// Number of concurrent transfers.
    #[arg(short = 'p', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Debounce window, e.g. `2s` or `750ms`.
    #[arg(short = 'd', long, value_name = "DURATION")]
    pub delay: Option<String>,

    /// Only synchronize files that look like UTF-8 text.
    #[arg(short = 't', long)]
    pub guess_text: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
