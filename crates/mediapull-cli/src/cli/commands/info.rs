//! `mediapull info <url>` and `mediapull update-engine` – one-shot engine commands.

use anyhow::Result;
use mediapull_core::Supervisor;

pub async fn run_info(sup: &Supervisor, url: &str) -> Result<()> {
    let info = sup.video_info(url).await?;
    println!("{:#}", info);
    Ok(())
}

pub async fn run_update_engine(sup: &Supervisor) -> Result<()> {
    let output = sup.update_engine().await?;
    print!("{output}");
    Ok(())
}
