// src/control/protocol.rs

//! Wire format of the control channel.
//!
//! One request and one response per connection, each a single JSON object
//! terminated by a newline:
//!
//! ```text
//! -> {"watchdir":{"local":"/data/app","remote":"host1:backups/app"}}
//! <- {"ok":"watching /data/app/ => host1:backups/app/"}
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};

/// Upper bound on a single encoded request or response.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    #[serde(rename = "watchdir")]
    WatchDir { local: String, remote: String },
    #[serde(rename = "removedir")]
    RemoveDir(String),
    #[serde(rename = "listwatched")]
    ListWatched {},
    #[serde(rename = "quitquitquit")]
    Quit {},
}

impl Request {
    /// Short name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::WatchDir { .. } => "watchdir",
            Request::RemoveDir(_) => "removedir",
            Request::ListWatched {} => "listwatched",
            Request::Quit {} => "quitquitquit",
        }
    }
}

/// Exactly one of `ok` / `err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Ok(String),
    Err(String),
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Response::Ok(m) | Response::Err(m) => m,
        }
    }
}

/// Serialize `msg` as one newline-terminated line.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let mut buf = serde_json::to_vec(msg)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Parse one line as read off the socket, trailing newline optional.
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &[u8]) -> Result<T> {
    if line.len() > MAX_MESSAGE_BYTES {
        return Err(SyncError::Protocol(format!(
            "message exceeds {MAX_MESSAGE_BYTES} bytes"
        )));
    }
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Err(SyncError::Protocol("empty message".to_string()));
    }
    serde_json::from_slice(trimmed)
        .map_err(|e| SyncError::Protocol(format!("malformed message: {e}")))
}
