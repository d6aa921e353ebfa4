//! Job read operations: list and get.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::{Path, PathBuf};

use super::super::db::JobDb;
use super::super::types::{Job, JobFile, JobProgress, JobStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, playlist_name, format, target_container, parallelism, number_items,
        destination_dir, status, created_at, total_items, completed_items,
        current_file_index, files_json
    FROM jobs
"#;

/// Map a row back to a `Job`. Transient progress hints start empty and the
/// completed count is re-derived from the file list rather than the stored column.
fn row_to_job(row: &SqliteRow) -> Result<Job> {
    let id: String = row.get("id");
    let files_json: String = row.get("files_json");
    let files: Vec<JobFile> = serde_json::from_str(&files_json)
        .with_context(|| format!("decode files for job {id}"))?;
    let status: String = row.get("status");
    let destination_dir: String = row.get("destination_dir");
    let number_items: i64 = row.get("number_items");
    let parallelism: i64 = row.get("parallelism");
    let current_file_index: i64 = row.get("current_file_index");

    let mut job = Job {
        id,
        playlist_name: row.get("playlist_name"),
        format: row.get("format"),
        target_container: row.get("target_container"),
        parallelism: parallelism.max(1) as u32,
        number_items: number_items != 0,
        destination_dir: PathBuf::from(destination_dir),
        files,
        status: JobStatus::from_str(&status),
        created_at: row.get("created_at"),
        progress: JobProgress {
            current_file_index: current_file_index.max(0) as usize,
            ..JobProgress::default()
        },
    };
    job.refresh_counts();
    Ok(job)
}

impl JobDb {
    /// List jobs with the ones needing attention first:
    /// downloading, then paused/zipping, then error, then everything else;
    /// newest first within each group. `limit` of `None` or 0 means all.
    pub async fn list_jobs(&self, limit: Option<usize>) -> Result<Vec<Job>> {
        let mut sql = format!(
            r#"{SELECT_COLUMNS}
            ORDER BY
                CASE status
                    WHEN 'downloading' THEN 3
                    WHEN 'paused' THEN 2
                    WHEN 'zipping' THEN 2
                    WHEN 'error' THEN 1
                    ELSE 0
                END DESC,
                created_at DESC,
                id DESC
            "#
        );
        if let Some(n) = limit.filter(|n| *n > 0) {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_job).collect()
    }

    /// Fetch a single job. A missing row is `Ok(None)`.
    pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_job).transpose()
    }

    /// Filenames recorded by every job that writes into `dir` (for collision detection).
    /// `exclude`, if set, is omitted from the list.
    pub async fn filenames_in_dir(&self, dir: &Path, exclude: Option<&str>) -> Result<Vec<String>> {
        let rows = sqlx::query(r#"SELECT id, files_json FROM jobs WHERE destination_dir = ?1"#)
            .bind(dir.to_string_lossy().as_ref())
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for row in rows {
            let id: String = row.get("id");
            if exclude == Some(id.as_str()) {
                continue;
            }
            let files_json: String = row.get("files_json");
            let files: Vec<JobFile> = match serde_json::from_str(&files_json) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(job_id = %id, "skipping undecodable files_json: {}", e);
                    continue;
                }
            };
            out.extend(files.into_iter().map(|f| f.filename));
        }
        Ok(out)
    }
}
