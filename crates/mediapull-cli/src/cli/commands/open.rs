//! `mediapull open <id>` and `mediapull open-root` – show folders in the file manager.

use anyhow::Result;
use mediapull_core::Supervisor;

pub async fn run_open(sup: &Supervisor, id: &str) -> Result<()> {
    let dir = sup.open_job_folder(id).await?;
    println!("Opened {}", dir.display());
    Ok(())
}

pub async fn run_open_root(sup: &Supervisor) -> Result<()> {
    let dir = sup.open_root_folder().await?;
    println!("Opened {}", dir.display());
    Ok(())
}
