//! The per-job supervision loop.

use super::item::ItemOutcome;
use super::{status_of, Supervisor};
use crate::error::JobResult;
use crate::job_db::{FileStatus, JobStatus};
use crate::registry::{lock_job, LoopGuard, SharedJob};

impl Supervisor {
    /// Drive a claimed job (status already `downloading`) to its next resting
    /// state: `completed`, `error`, or `paused`. Ownership ends when `_guard` drops.
    pub(super) async fn drive(
        &self,
        id: &str,
        shared: SharedJob,
        _guard: LoopGuard,
    ) -> JobResult<JobStatus> {
        if let Err(e) = self.launcher.wait_until_ready().await {
            tracing::error!(job_id = %id, "engine not ready: {e}");
            {
                let mut job = lock_job(&shared);
                if job.status == JobStatus::Downloading {
                    job.status = JobStatus::Error;
                }
            }
            self.persist(&shared).await;
            return Err(e.into());
        }

        let (start, total) = {
            let mut job = lock_job(&shared);
            let start = job.resume_index();
            job.progress.current_file_index = start;
            (start, job.files.len())
        };
        tracing::info!(job_id = %id, start, total, "supervising job");

        for index in start..total {
            // Check for pause and claim the item under one lock so a pause
            // between items never lets a new item start.
            let step = {
                let mut job = lock_job(&shared);
                if job.status == JobStatus::Paused {
                    Step::Stop
                } else if job.files[index].status == FileStatus::Completed {
                    Step::Skip
                } else {
                    job.files[index].status = FileStatus::Downloading;
                    job.progress.current_file_index = index;
                    job.progress.clear_transient();
                    Step::Run
                }
            };
            match step {
                Step::Stop => break,
                Step::Skip => continue,
                Step::Run => {}
            }
            if !self.persist(&shared).await {
                break;
            }

            let outcome = self.run_item(id, &shared, index).await;
            {
                let mut job = lock_job(&shared);
                match &outcome {
                    ItemOutcome::Completed { filename } => {
                        let file = &mut job.files[index];
                        if let Some(name) = filename {
                            if *name != file.filename {
                                tracing::info!(job_id = %id, index, from = %file.filename, to = %name, "output landed under a different name");
                                file.filename = name.clone();
                            }
                        }
                        file.status = FileStatus::Completed;
                    }
                    ItemOutcome::Failed => job.files[index].status = FileStatus::Error,
                    // Partial output stays in staging; the item is redone on resume.
                    ItemOutcome::Paused => job.files[index].status = FileStatus::Pending,
                }
                job.progress.clear_transient();
            }
            if !self.persist(&shared).await || outcome == ItemOutcome::Paused {
                break;
            }
        }

        let final_status = {
            let mut job = lock_job(&shared);
            if job.status != JobStatus::Paused {
                job.status = if job.all_completed() {
                    JobStatus::Completed
                } else {
                    JobStatus::Error
                };
            }
            job.status
        };
        // Also when paused: the row must end at the state the loop stopped in.
        self.persist(&shared).await;
        let completed = lock_job(&shared).completed_count();
        tracing::info!(job_id = %id, status = %final_status, completed, total, "supervision finished");
        Ok(status_of(&shared))
    }
}

enum Step {
    Run,
    Skip,
    Stop,
}
