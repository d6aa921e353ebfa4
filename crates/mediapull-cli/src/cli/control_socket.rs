//! Control socket: server (during `mediapull resume`) and client (for `mediapull pause`).
//! Protocol: one request line, one reply line.
//! `ping` → `pong`; `pause <id>` → `ok <status>` or `err <message>`.

use anyhow::Result;
use mediapull_core::Supervisor;
use std::path::Path;

/// Handle one request line against the runner's supervisor.
#[cfg_attr(not(unix), allow(dead_code))]
async fn handle_line(sup: &Supervisor, line: &str) -> String {
    let line = line.trim();
    if line == "ping" {
        return "pong".to_string();
    }
    match line.strip_prefix("pause ").map(str::trim) {
        Some(id) if !id.is_empty() => match sup.pause_job(id).await {
            Ok(status) => format!("ok {status}"),
            Err(e) => format!("err {e}"),
        },
        _ => format!("err unknown command: {line}"),
    }
}

#[cfg(unix)]
mod imp {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{UnixListener, UnixStream};

    /// Listen on `path` and apply each request to `sup`. Replaces a stale socket file.
    pub fn spawn_control_listener(
        sup: Supervisor,
        path: impl AsRef<Path>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        tracing::debug!(path = %path.display(), "control socket listening");
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let sup = sup.clone();
                        tokio::spawn(async move {
                            let (read, mut write) = stream.into_split();
                            let mut reader = BufReader::new(read).lines();
                            while let Ok(Some(line)) = reader.next_line().await {
                                let reply = handle_line(&sup, &line).await;
                                if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                                    break;
                                }
                            }
                        });
                    }
                    Err(e) => tracing::debug!("control socket accept: {}", e),
                }
            }
        });
        Ok(handle)
    }

    /// Send one request and return the reply. `None` when no runner is listening.
    pub async fn send_command(socket_path: &Path, request: &str) -> Result<Option<String>> {
        let mut stream = match UnixStream::connect(socket_path).await {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };
        stream.write_all(format!("{request}\n").as_bytes()).await?;
        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply).await?;
        Ok(Some(reply.trim().to_string()))
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;

    pub fn spawn_control_listener(
        _sup: Supervisor,
        _path: impl AsRef<Path>,
    ) -> Result<tokio::task::JoinHandle<()>> {
        anyhow::bail!("control socket is only available on unix")
    }

    pub async fn send_command(_socket_path: &Path, _request: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

pub use imp::{send_command, spawn_control_listener};

/// Whether another process is serving the control socket.
pub async fn runner_alive(socket_path: &Path) -> bool {
    matches!(send_command(socket_path, "ping").await, Ok(Some(reply)) if reply == "pong")
}
