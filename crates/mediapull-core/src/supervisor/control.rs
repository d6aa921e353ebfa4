//! Boundary operations on existing jobs: resume, pause, query, delete.

use super::{snapshot_of, status_of, Supervisor};
use crate::error::{JobError, JobResult};
use crate::job_db::{FileStatus, Job, JobStatus};
use crate::registry::{lock_job, LoopGuard, SharedJob};
use crate::staging;

impl Supervisor {
    async fn load(&self, id: &str) -> JobResult<SharedJob> {
        self.registry
            .get_or_load(&self.db, id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Take loop ownership and check-and-set `downloading` on the live copy.
    /// A loop still unwinding from a pause is waited out, so a resume right
    /// after a pause is not lost. `Err(status)` when the job is running or
    /// not in a resumable state.
    async fn claim(&self, id: &str, shared: &SharedJob) -> Result<LoopGuard, JobStatus> {
        loop {
            if let Some(guard) = self.registry.begin_loop(id) {
                let mut job = lock_job(shared);
                if !job.status.is_resumable() {
                    return Err(job.status);
                }
                job.status = JobStatus::Downloading;
                job.progress.clear_transient();
                job.refresh_counts();
                return Ok(guard);
            }
            let status = status_of(shared);
            if !status.is_resumable() {
                return Err(status);
            }
            tracing::debug!(job_id = %id, status = %status, "waiting for the previous loop to stop");
            self.registry.loop_released(id).await;
        }
    }

    /// Start supervising `id` in the background. Resuming a job that is
    /// already downloading (or completed) changes nothing and reports its status.
    /// Right after a pause this returns once the paused loop has stopped.
    pub async fn resume_job(&self, id: &str) -> JobResult<JobStatus> {
        let shared = self.load(id).await?;
        let guard = match self.claim(id, &shared).await {
            Ok(guard) => guard,
            Err(status) => {
                tracing::debug!(job_id = %id, status = %status, "resume ignored");
                return Ok(status);
            }
        };
        self.persist(&shared).await;

        let this = self.clone();
        let job_id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = this.drive(&job_id, shared, guard).await {
                tracing::error!(job_id = %job_id, "supervision ended with error: {e}");
            }
        });
        Ok(JobStatus::Downloading)
    }

    /// Like `resume_job`, but drives the loop on the caller's task and returns
    /// the final status.
    pub async fn run_job(&self, id: &str) -> JobResult<JobStatus> {
        let shared = self.load(id).await?;
        let guard = match self.claim(id, &shared).await {
            Ok(guard) => guard,
            Err(status) => {
                tracing::debug!(job_id = %id, status = %status, "run ignored");
                return Ok(status);
            }
        };
        self.persist(&shared).await;
        self.drive(id, shared, guard).await
    }

    /// Mark the job paused and kill its live subprocess, if any. Idempotent;
    /// a completed job stays completed.
    pub async fn pause_job(&self, id: &str) -> JobResult<JobStatus> {
        let shared = self.load(id).await?;
        let changed = {
            let mut job = lock_job(&shared);
            match job.status {
                JobStatus::Completed | JobStatus::Paused => false,
                _ => {
                    job.status = JobStatus::Paused;
                    true
                }
            }
        };
        let killed = self.registry.kill(id);
        if changed {
            self.persist(&shared).await;
        }
        tracing::info!(job_id = %id, killed, "pause requested");
        Ok(status_of(&shared))
    }

    /// Current snapshot: the live copy when referenced, else the stored row.
    pub async fn job_status(&self, id: &str) -> JobResult<Job> {
        if let Some(job) = self.registry.snapshot(id) {
            return Ok(job);
        }
        self.db
            .get_job(id)
            .await?
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Stored jobs in attention order, with live copies substituted.
    pub async fn list_jobs(&self, limit: Option<usize>) -> JobResult<Vec<Job>> {
        let stored = self.db.list_jobs(limit).await?;
        Ok(stored
            .into_iter()
            .map(|job| self.registry.snapshot(&job.id).unwrap_or(job))
            .collect())
    }

    /// Remove a job. A running job is paused first. With `delete_files`,
    /// completed outputs (and their sibling extensions) are removed along with
    /// the job's partial files in staging, and the job's directory is dropped
    /// if it ends up empty, unless it is the root.
    pub async fn delete_job(&self, id: &str, delete_files: bool) -> JobResult<()> {
        let mut job = self.job_status(id).await?;
        if job.status == JobStatus::Downloading {
            self.pause_job(id).await?;
        }
        // Let a killed engine and its loop finish before touching files.
        if self.registry.is_supervised(id) {
            self.registry.loop_released(id).await;
        }
        if let Some(shared) = self.registry.get(id) {
            job = snapshot_of(&shared);
        }

        if delete_files {
            let dir = &job.destination_dir;
            let mut removed = 0;
            for file in job.files.iter().filter(|f| f.status == FileStatus::Completed) {
                removed += staging::remove_outputs(dir, &file.filename);
            }
            let staging_dir = staging::staging_dir(dir);
            let leftovers: usize = job
                .files
                .iter()
                .map(|f| staging::remove_staged_leftovers(&staging_dir, &f.filename))
                .sum();
            staging::remove_dir_if_empty(&staging_dir).await;
            if !same_dir(dir, &self.settings.download_root) {
                staging::remove_dir_if_empty(dir).await;
            }
            tracing::info!(job_id = %id, removed, leftovers, "deleted job files");
        }

        self.registry.forget(id);
        self.db.delete_job(id).await?;
        tracing::info!(job_id = %id, "job deleted");
        Ok(())
    }

    /// Reset jobs a crashed process left in `downloading` so they can resume.
    /// Only call when no other process is supervising this store.
    pub async fn recover_interrupted(&self) -> JobResult<u64> {
        let n = self.db.recover_interrupted_jobs().await?;
        if n > 0 {
            tracing::info!(jobs = n, "recovered interrupted jobs");
        }
        Ok(n)
    }
}

fn same_dir(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
