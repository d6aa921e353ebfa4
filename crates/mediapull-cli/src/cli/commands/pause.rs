//! `mediapull pause <id>` – pause a job. If `mediapull resume` is active, it stops the download.

use anyhow::Result;
use mediapull_core::{config, Supervisor};

use crate::cli::control_socket;

pub async fn run_pause(sup: &Supervisor, id: &str) -> Result<()> {
    if let Ok(path) = config::control_socket_path() {
        match control_socket::send_command(&path, &format!("pause {id}")).await {
            Ok(Some(reply)) => {
                if let Some(status) = reply.strip_prefix("ok ") {
                    println!("Paused job {id} ({status})");
                    return Ok(());
                }
                anyhow::bail!("{}", reply.trim_start_matches("err "));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("control socket request failed: {:#}", e),
        }
    }
    let status = sup.pause_job(id).await?;
    println!("Paused job {id} ({status})");
    Ok(())
}
