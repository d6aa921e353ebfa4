//! `mediapull status <id>` – show one job and its items.

use anyhow::Result;
use mediapull_core::Supervisor;

pub async fn run_status(sup: &Supervisor, id: &str) -> Result<()> {
    let job = sup.job_status(id).await?;
    println!("Job:       {}", job.id);
    println!("Name:      {}", job.playlist_name);
    println!("Status:    {}", job.status);
    println!("Format:    {}", job.format);
    if let Some(container) = &job.target_container {
        println!("Container: {container}");
    }
    println!("Folder:    {}", job.destination_dir.display());
    println!("Progress:  {}/{}", job.progress.completed, job.progress.total);
    println!();
    println!("{:<4} {:<12} {}", "#", "STATUS", "FILE");
    for (i, f) in job.files.iter().enumerate() {
        println!(
            "{:<4} {:<12} {}",
            i + 1,
            format!("{:?}", f.status).to_lowercase(),
            f.filename
        );
    }
    Ok(())
}
