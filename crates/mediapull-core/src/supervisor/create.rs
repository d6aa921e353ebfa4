//! Job creation: validation, id allocation, filename planning.

use std::sync::atomic::{AtomicU32, Ordering};

use super::Supervisor;
use crate::engine::default_container;
use crate::error::{JobError, JobResult};
use crate::job_db::{unix_millis, FileStatus, Job, JobFile, JobId, JobProgress, JobStatus};
use crate::naming::{self, NamePlanner};

/// A batch submission.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub urls: Vec<String>,
    /// Source-provided titles, matched to `urls` by position.
    pub titles: Vec<String>,
    /// Engine format selector; `best` when blank.
    pub format: String,
    pub target_container: Option<String>,
    /// Subfolder of the download root; the root itself when absent.
    pub folder: Option<String>,
    pub playlist_name: Option<String>,
    pub number_items: bool,
    /// Engine fragment concurrency; the configured default when absent.
    pub parallelism: Option<u32>,
}

static ID_SEQ: AtomicU32 = AtomicU32::new(0);

/// `<unix millis>-<seq>`: sorts by creation time, unique within the process.
fn next_job_id(now_ms: i64) -> JobId {
    let seq = ID_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("{now_ms}-{seq:03}")
}

impl Supervisor {
    /// Validate and persist a new `idle` job. Returns its id.
    pub async fn create_job(&self, request: NewJob) -> JobResult<JobId> {
        let urls: Vec<String> = request
            .urls
            .iter()
            .map(|u| u.trim().to_string())
            .collect();
        if urls.is_empty() {
            return Err(JobError::InvalidRequest("no URLs given".into()));
        }
        if let Some(pos) = urls.iter().position(|u| u.is_empty()) {
            return Err(JobError::InvalidRequest(format!("URL #{} is blank", pos + 1)));
        }

        let format = Some(request.format.trim())
            .filter(|f| !f.is_empty())
            .unwrap_or("best")
            .to_string();
        let target_container = request
            .target_container
            .as_deref()
            .map(|c| c.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|c| !c.is_empty());
        let extension = target_container
            .clone()
            .unwrap_or_else(|| default_container(&format).to_string());

        let destination_dir = match request
            .folder
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
        {
            Some(folder) => {
                let name = naming::folder_name(folder).ok_or_else(|| {
                    JobError::InvalidRequest(format!("unusable folder name {folder:?}"))
                })?;
                self.settings.download_root.join(name)
            }
            None => self.settings.download_root.clone(),
        };
        tokio::fs::create_dir_all(&destination_dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", destination_dir.display()))?;

        let recorded = self.db.filenames_in_dir(&destination_dir, None).await?;
        let mut planner = NamePlanner::new(&destination_dir, recorded);
        let filenames = naming::plan_filenames(
            &mut planner,
            &request.titles,
            urls.len(),
            request.number_items,
            &extension,
        );

        let files: Vec<JobFile> = urls
            .into_iter()
            .zip(filenames)
            .enumerate()
            .map(|(idx, (url, filename))| JobFile {
                url,
                title: request
                    .titles
                    .get(idx)
                    .cloned()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("Video {}", idx + 1)),
                filename,
                status: FileStatus::Pending,
            })
            .collect();

        let created_at = unix_millis();
        let id = next_job_id(created_at);
        let job = Job {
            id: id.clone(),
            playlist_name: request
                .playlist_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "batch".to_string()),
            format,
            target_container,
            parallelism: request
                .parallelism
                .unwrap_or(self.settings.default_parallelism)
                .max(1),
            number_items: request.number_items,
            destination_dir,
            progress: JobProgress {
                total: files.len(),
                completed: 0,
                current_file_index: 0,
                ..JobProgress::default()
            },
            files,
            status: JobStatus::Idle,
            created_at,
        };

        self.db.insert_job(&job).await?;
        tracing::info!(job_id = %id, items = job.files.len(), dir = %job.destination_dir.display(), "job created");
        self.hub.send_job(job);
        Ok(id)
    }
}
