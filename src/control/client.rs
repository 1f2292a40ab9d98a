// src/control/client.rs

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::control::protocol::{decode_line, encode_line, Request, Response, MAX_MESSAGE_BYTES};
use crate::errors::{Result, SyncError};

/// Send one request to a running daemon and wait for its answer.
pub async fn send_request(socket: &Path, req: &Request) -> Result<Response> {
    let stream = UnixStream::connect(socket).await.map_err(|e| {
        SyncError::Protocol(format!(
            "cannot connect to daemon at {}: {e}",
            socket.display()
        ))
    })?;
    let (read, mut write) = stream.into_split();

    write.write_all(&encode_line(req)?).await?;
    write.shutdown().await?;

    let mut reader = BufReader::new(read).take(MAX_MESSAGE_BYTES as u64 + 1);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    decode_line(&line)
}
