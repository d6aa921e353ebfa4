//! `mediapull remove <id>` – remove a job; optionally delete its files with --delete-files.

use anyhow::Result;
use mediapull_core::Supervisor;

pub async fn run_remove(sup: &Supervisor, id: &str, delete_files: bool) -> Result<()> {
    sup.delete_job(id, delete_files).await?;
    if delete_files {
        println!("Removed job {id} and its files");
    } else {
        println!("Removed job {id}");
    }
    Ok(())
}
