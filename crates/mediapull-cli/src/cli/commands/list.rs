//! `mediapull list` – list jobs, most actionable first.

use anyhow::Result;
use mediapull_core::Supervisor;

pub async fn run_list(sup: &Supervisor, limit: Option<usize>) -> Result<()> {
    let jobs = sup.list_jobs(limit).await?;
    if jobs.is_empty() {
        println!("No jobs in database.");
        return Ok(());
    }
    println!("{:<18} {:<12} {:<8} {}", "ID", "STATUS", "DONE", "NAME");
    for j in jobs {
        println!(
            "{:<18} {:<12} {:<8} {}",
            j.id,
            j.status,
            format!("{}/{}", j.progress.completed, j.progress.total),
            j.playlist_name
        );
    }
    Ok(())
}
