// src/lib.rs

pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command, DaemonArgs};
use crate::config::{default_config_path, load_or_default, ConfigFile};
use crate::control::{send_request, ControlServer, Request, Response};
use crate::engine::{Daemon, Runtime};
use crate::exec::{DispatchPool, RsyncBackend, TransferBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::SnapshotStore;
use crate::watch::{EventCollector, IgnorePolicy, NotifyWatchSource};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    match args.command {
        Command::Daemon(ref overrides) => {
            let cfg = build_config(&config_path, Some(overrides))?;
            let socket = args.socket.clone().unwrap_or_else(|| cfg.daemon.socket.clone());
            run_daemon(cfg, socket).await
        }
        Command::Add { ref local, ref remote } => {
            let local = std::path::absolute(local)
                .with_context(|| format!("cannot resolve {}", local.display()))?;
            let req = Request::WatchDir {
                local: local.to_string_lossy().into_owned(),
                remote: remote.clone(),
            };
            run_client(&client_socket(&args, &config_path)?, req).await
        }
        Command::Remove { ref local } => {
            let local = std::path::absolute(local)
                .with_context(|| format!("cannot resolve {}", local.display()))?;
            let req = Request::RemoveDir(local.to_string_lossy().into_owned());
            run_client(&client_socket(&args, &config_path)?, req).await
        }
        Command::List => {
            run_client(&client_socket(&args, &config_path)?, Request::ListWatched {}).await
        }
        Command::Quit => run_client(&client_socket(&args, &config_path)?, Request::Quit {}).await,
    }
}

/// Load the config file (defaults when absent), apply CLI overrides, validate.
pub fn build_config(path: &Path, overrides: Option<&DaemonArgs>) -> Result<ConfigFile> {
    let mut raw = load_or_default(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;

    if let Some(o) = overrides {
        if let Some(p) = o.parallel {
            raw.daemon.parallel = p;
        }
        if let Some(ref d) = o.delay {
            raw.daemon.delay = d.clone();
        }
        if o.guess_text {
            raw.daemon.guess_text = true;
        }
    }

    Ok(ConfigFile::try_from(raw)?)
}

fn client_socket(args: &CliArgs, config_path: &Path) -> Result<PathBuf> {
    match args.socket {
        Some(ref s) => Ok(s.clone()),
        None => Ok(build_config(config_path, None)?.daemon.socket),
    }
}

async fn run_client(socket: &Path, req: Request) -> Result<()> {
    match send_request(socket, &req).await? {
        Response::Ok(msg) => {
            println!("{msg}");
            Ok(())
        }
        Response::Err(msg) => Err(anyhow!(msg)),
    }
}

/// Wire up and run the daemon until `quit` or Ctrl-C.
///
/// Only failing to bind the control socket or to start the notification
/// source is fatal; a broken snapshot starts the daemon with no watches.
pub async fn run_daemon(cfg: ConfigFile, socket: PathBuf) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let policy = Arc::new(IgnorePolicy::from_config(&cfg, Arc::clone(&fs))?);
    let (source, rx) = NotifyWatchSource::new().context("failed to start file watcher")?;
    let backend: Arc<dyn TransferBackend> = Arc::new(RsyncBackend::from_config(&cfg.daemon));
    let snapshot = SnapshotStore::new(cfg.daemon.state_file.clone(), Arc::clone(&fs));

    let daemon = Daemon::new(Box::new(source), Arc::clone(&backend), fs, policy, snapshot);
    let server = ControlServer::bind(&socket, daemon.clone())
        .with_context(|| format!("failed to bind control socket {}", socket.display()))?;

    match daemon.restore().await {
        Ok(summary) => info!(
            restored = summary.restored.len(),
            skipped = summary.skipped.len(),
            "restored watches from snapshot"
        ),
        Err(err) => warn!(
            path = ?cfg.daemon.state_file,
            error = %err,
            "could not restore snapshot; starting with no watches"
        ),
    }

    let collector = EventCollector::new(rx, cfg.daemon.delay, cfg.daemon.quiet);
    let pool = DispatchPool::new(cfg.daemon.parallel, backend);
    let runtime = Runtime::new(daemon.clone(), collector, pool, cfg.daemon.delay);
    let runtime = tokio::spawn(runtime.run());

    // Ctrl-C → graceful shutdown.
    {
        let daemon = daemon.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            daemon.request_shutdown();
        });
    }

    let served = server.run().await;
    daemon.request_shutdown();

    match runtime.await {
        Ok(res) => res?,
        Err(err) => error!(error = %err, "notification loop panicked"),
    }
    served?;

    info!("watchsync stopped");
    Ok(())
}
