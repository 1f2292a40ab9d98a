// src/control/handler.rs

use std::path::Path;

use tracing::{debug, warn};

use crate::control::protocol::{Request, Response};
use crate::engine::Daemon;

/// Execute one decoded request against the daemon.
///
/// Every failure becomes an `err` response; nothing here is fatal.
pub async fn handle_request(daemon: &Daemon, req: Request) -> Response {
    let op = req.op();
    debug!(op, "handling control request");

    let res = match req {
        Request::WatchDir { local, remote } => daemon
            .watch(Path::new(&local), &remote)
            .await
            .map(|wd| format!("watching {wd}")),
        Request::RemoveDir(local) => daemon
            .unwatch(Path::new(&local))
            .map(|wd| format!("stopped watching {wd}")),
        Request::ListWatched {} => Ok(format_list(&daemon.list())),
        Request::Quit {} => {
            daemon.request_shutdown();
            Ok("shutting down".to_string())
        }
    };

    match res {
        Ok(msg) => Response::Ok(msg),
        Err(err) => {
            warn!(op, error = %err, "control request failed");
            Response::Err(err.to_string())
        }
    }
}

fn format_list(dirs: &[crate::registry::WatchedDir]) -> String {
    if dirs.is_empty() {
        return "no watched directories".to_string();
    }
    dirs.iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
