//! SQLite-backed job database implementation.
//!
//! Handles connection, schema setup, and timestamp helpers. Job CRUD lives in `jobs`.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;

use super::legacy;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed job database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/mediapull/jobs.db` on Linux.
#[derive(Clone)]
pub struct JobDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl JobDb {
    /// Open (or create) the default job database, create the schema, and fold in
    /// a legacy `jobs.json` list if one is still lying around.
    pub async fn open_default() -> Result<Self> {
        let state_dir = config::state_dir()?;
        let db = Self::open_at(state_dir.join("jobs.db")).await?;

        let imported = legacy::import_legacy_jobs(&db, &state_dir.join(legacy::LEGACY_FILE_NAME))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("legacy job import failed: {:#}", e);
                0
            });
        if imported > 0 {
            tracing::info!("imported {} legacy job(s)", imported);
        }
        Ok(db)
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let db = JobDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // One row per job; the ordered item list is a JSON blob since it is
        // always read and rewritten as a whole.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                playlist_name TEXT NOT NULL,
                format TEXT NOT NULL,
                target_container TEXT,
                parallelism INTEGER NOT NULL,
                number_items INTEGER NOT NULL,
                destination_dir TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                total_items INTEGER NOT NULL,
                completed_items INTEGER NOT NULL,
                current_file_index INTEGER NOT NULL,
                files_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC);")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Current time as Unix milliseconds (job ids, `created_at`, `updated_at`).
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<JobDb> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = JobDb { pool };
    db.migrate().await?;
    Ok(db)
}
