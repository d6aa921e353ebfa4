//! `mediapull cookies <file>` / `mediapull cookies --clear` – manage engine cookies.

use anyhow::{Context, Result};
use mediapull_core::Supervisor;
use std::path::Path;

pub async fn run_cookies(sup: &Supervisor, file: Option<&Path>, clear: bool) -> Result<()> {
    let content = match file {
        Some(path) if !clear => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?,
        _ => String::new(),
    };
    sup.save_cookies(&content).await?;
    if content.trim().is_empty() {
        println!("Cookies cleared");
    } else {
        println!("Cookies saved to {}", sup.settings().cookie_file.display());
    }
    Ok(())
}
