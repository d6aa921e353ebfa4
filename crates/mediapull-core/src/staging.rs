//! Output file lifecycle: staging directory, salvage, final move, removal.
//!
//! The engine writes into `<destination>/.incomplete/` and a finished file is
//! renamed into the destination only once the item is known good, so the
//! destination never holds partial output.

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::retry::{self, ErrorKind, RetryPolicy};

/// Hidden staging subdirectory name.
pub const STAGING_DIR_NAME: &str = ".incomplete";

/// Extensions removed alongside a completed file on delete.
pub const DELETE_SIBLING_EXTENSIONS: &[&str] = &[".mkv", ".webm", ".part", ".ytdl"];

/// Engine intermediates that never count as finished output.
const PARTIAL_EXTENSIONS: &[&str] = &["part", "ytdl", "temp"];

pub fn staging_dir(destination: &Path) -> PathBuf {
    destination.join(STAGING_DIR_NAME)
}

/// Create the staging directory (and the destination) if missing.
pub async fn ensure_staging(destination: &Path) -> Result<PathBuf> {
    let dir = staging_dir(destination);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("failed to create staging dir {}", dir.display()))?;
    Ok(dir)
}

fn non_empty_file(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = std::fs::metadata(path).ok()?;
    if !meta.is_file() || meta.len() == 0 {
        return None;
    }
    Some((meta.len(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
}

/// Locate the engine's finished output for `expected_name` in `staging`.
///
/// The exact name wins. Otherwise the newest non-empty file with the same
/// base name and any final extension is taken, which covers merges that
/// land in a different container than predicted.
pub fn find_output(staging: &Path, expected_name: &str) -> Option<PathBuf> {
    let exact = staging.join(expected_name);
    if non_empty_file(&exact).is_some() {
        return Some(exact);
    }

    let base = Path::new(expected_name).file_stem()?.to_os_string();
    let entries = std::fs::read_dir(staging).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_stem() == Some(base.as_os_str()))
        .filter(|p| {
            p.extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_ascii_lowercase();
                    !PARTIAL_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .filter_map(|p| non_empty_file(&p).map(|(_, mtime)| (p, mtime)))
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(p, _)| p)
}

fn classify_move_error(e: &io::Error) -> ErrorKind {
    // A vanished source will not come back; any other failure is likely a
    // scanner or indexer holding the fresh file.
    if e.kind() == io::ErrorKind::NotFound {
        ErrorKind::Fatal
    } else {
        ErrorKind::Transient
    }
}

/// Move `src` into `destination_dir` under its own file name, replacing any
/// file already there. Retries per `policy`.
pub async fn move_to_destination(
    src: &Path,
    destination_dir: &Path,
    policy: &RetryPolicy,
) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("staged output has no file name: {}", src.display()))?;
    let dest = destination_dir.join(name);

    retry::run_with_retry(
        policy,
        |_| {
            let src = src.to_path_buf();
            let dest = dest.clone();
            async move {
                match tokio::fs::remove_file(&dest).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                tokio::fs::rename(&src, &dest).await
            }
        },
        |e, attempt| {
            tracing::warn!(
                src = %src.display(),
                attempt,
                max = policy.max_attempts,
                "move to destination failed: {e}"
            );
            classify_move_error(e)
        },
    )
    .await
    .with_context(|| format!("failed to move {} to {}", src.display(), dest.display()))?;

    Ok(dest)
}

/// Remove `dir` if it exists and holds nothing. Returns whether it was removed.
pub async fn remove_dir_if_empty(dir: &Path) -> bool {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return false,
    };
    match entries.next_entry().await {
        Ok(None) => tokio::fs::remove_dir(dir).await.is_ok(),
        _ => false,
    }
}

/// Delete `filename` in `dir` plus its sibling-extension variants.
/// Only direct children of `dir` are touched.
pub fn remove_outputs(dir: &Path, filename: &str) -> usize {
    let Some(name) = Path::new(filename).file_name() else {
        return 0;
    };
    let target = dir.join(name);
    let mut removed = 0;
    if std::fs::remove_file(&target).is_ok() {
        removed += 1;
    }
    if let Some(base) = target.file_stem().map(|s| s.to_string_lossy().into_owned()) {
        for ext in DELETE_SIBLING_EXTENSIONS {
            if std::fs::remove_file(dir.join(format!("{base}{ext}"))).is_ok() {
                removed += 1;
            }
        }
    }
    removed
}

/// Delete everything the engine left in `staging` for `filename`: the name
/// itself and any `<stem>.*` intermediate (`.part`, `.ytdl`, format-suffixed
/// fragments). Returns the number of files removed.
pub fn remove_staged_leftovers(staging: &Path, filename: &str) -> usize {
    let Some(stem) = Path::new(filename).file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return 0;
    };
    let prefix = format!("{stem}.");
    let Ok(entries) = std::fs::read_dir(staging) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name == filename || name.starts_with(&prefix)
        })
        .filter(|e| std::fs::remove_file(e.path()).is_ok())
        .count()
}
