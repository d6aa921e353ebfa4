//! One-shot import of the legacy flat-file job list.
//!
//! Older builds kept every job in a single `jobs.json` array. On open, each entry
//! whose id is not already in the database is inserted, then the file is renamed
//! to `jobs.json.bak` so the import never runs twice.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::db::JobDb;
use super::types::Job;

/// Legacy job list file name inside the state directory.
pub const LEGACY_FILE_NAME: &str = "jobs.json";

fn backup_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".bak");
    PathBuf::from(o)
}

/// Import legacy jobs from `path` into `db`. Returns the number of jobs inserted.
/// A missing file is a no-op, so this is safe to call on every startup.
pub async fn import_legacy_jobs(db: &JobDb, path: &Path) -> Result<usize> {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
    };

    let legacy: Vec<Job> = serde_json::from_str(&data)
        .with_context(|| format!("parse legacy job list {}", path.display()))?;

    let mut inserted = 0;
    for mut job in legacy {
        if db.get_job(&job.id).await?.is_some() {
            continue;
        }
        job.refresh_counts();
        db.insert_job(&job).await?;
        inserted += 1;
    }

    tokio::fs::rename(path, backup_path(path))
        .await
        .with_context(|| format!("rename legacy job list {}", path.display()))?;
    Ok(inserted)
}
