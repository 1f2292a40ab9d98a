// src/control/server.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::control::handler::handle_request;
use crate::control::protocol::{decode_line, encode_line, Request, Response, MAX_MESSAGE_BYTES};
use crate::engine::Daemon;
use crate::errors::{Result, SyncError};

/// How long a client has to send its request line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed `accept`, e.g. while out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Sequential accept loop on a Unix socket.
#[derive(Debug)]
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
    daemon: Daemon,
    read_timeout: Duration,
}

impl ControlServer {
    /// Bind `path`, replacing a stale socket file left by a previous run.
    pub fn bind(path: &Path, daemon: Daemon) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if path.exists() {
            debug!(?path, "removing stale control socket");
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        info!(?path, "control endpoint listening");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            daemon,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Serve until shutdown is requested. The connection in progress is
    /// always answered before the loop stops. Failed accepts and broken
    /// connections are logged and never end the loop.
    pub async fn run(self) -> Result<()> {
        let mut shutdown = self.daemon.subscribe_shutdown();

        loop {
            if self.daemon.is_shutdown() {
                break;
            }

            let stream = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                _ = shutdown.changed() => continue,
            };

            if let Err(err) = self.serve(stream).await {
                warn!(error = %err, "control connection failed");
            }
        }

        if let Err(err) = std::fs::remove_file(&self.path) {
            debug!(path = ?self.path, error = %err, "could not remove control socket");
        }
        info!("control endpoint stopped");
        Ok(())
    }

    async fn serve(&self, stream: UnixStream) -> Result<()> {
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read).take(MAX_MESSAGE_BYTES as u64 + 1);
        let mut line = Vec::new();
        let read = tokio::time::timeout(self.read_timeout, reader.read_until(b'\n', &mut line))
            .await
            .map_err(|_| {
                SyncError::Protocol(format!(
                    "no request received within {:?}",
                    self.read_timeout
                ))
            });

        let decoded = match read {
            Ok(res) => res.map_err(SyncError::from).and_then(|_| decode_line::<Request>(&line)),
            Err(err) => Err(err),
        };

        let response = match decoded {
            Ok(req) => handle_request(&self.daemon, req).await,
            Err(err) => {
                warn!(error = %err, "bad control request");
                Response::Err(err.to_string())
            }
        };

        write.write_all(&encode_line(&response)?).await?;
        write.shutdown().await?;
        Ok(())
    }
}
