//! `mediapull add <url>...` – create a batch job, optionally running it at once.

use anyhow::Result;
use clap::Args;
use mediapull_core::{NewJob, Supervisor};

use super::resume::run_resume;

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Video URLs, processed in the given order.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Title for each URL, in order (repeat the flag). Used for filenames.
    #[arg(long = "title", value_name = "TITLE")]
    pub titles: Vec<String>,

    /// Engine format selector (e.g. best, bestaudio, 137+140).
    #[arg(long, default_value = "best")]
    pub format: String,

    /// Output container to convert to (e.g. mp4, mkv, mp3).
    #[arg(long, value_name = "EXT")]
    pub container: Option<String>,

    /// Subfolder of the download root for this batch.
    #[arg(long)]
    pub folder: Option<String>,

    /// Display name for the batch.
    #[arg(long)]
    pub name: Option<String>,

    /// Prefix filenames with their position ("01 - ").
    #[arg(long)]
    pub number: bool,

    /// Fragment concurrency for the engine.
    #[arg(long, value_name = "N")]
    pub parallelism: Option<u32>,

    /// Start downloading immediately in the foreground.
    #[arg(long)]
    pub start: bool,
}

pub async fn run_add(sup: &Supervisor, args: AddArgs) -> Result<()> {
    let request = NewJob {
        urls: args.urls,
        titles: args.titles,
        format: args.format,
        target_container: args.container,
        folder: args.folder,
        playlist_name: args.name,
        number_items: args.number,
        parallelism: args.parallelism,
    };
    let id = sup.create_job(request).await?;
    let job = sup.job_status(&id).await?;
    println!(
        "Added job {id} ({} item(s)) -> {}",
        job.files.len(),
        job.destination_dir.display()
    );
    if args.start {
        run_resume(sup, &[id]).await?;
    }
    Ok(())
}
