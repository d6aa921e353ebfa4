//! Types used by the job database.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Job identifier: `<created_at millis>-<sequence>`, so ids sort by creation time.
pub type JobId = String;

/// High-level job state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Downloading,
    Paused,
    /// Packaging phase owned by an external collaborator; never entered by the supervisor.
    Zipping,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Zipping => "zipping",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "idle" => JobStatus::Idle,
            "downloading" => JobStatus::Downloading,
            "paused" => JobStatus::Paused,
            "zipping" => JobStatus::Zipping,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Error,
        }
    }

    /// Whether `resume` may start a supervision loop from this state.
    pub fn is_resumable(self) -> bool {
        matches!(self, JobStatus::Idle | JobStatus::Paused | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Error,
}

/// One URL within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFile {
    pub url: String,
    pub title: String,
    pub filename: String,
    #[serde(default)]
    pub status: FileStatus,
}

/// Cached progress view. `completed` is always derived from file statuses;
/// the speed/size/percent fields are UI hints and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub total: usize,
    pub completed: usize,
    #[serde(default)]
    pub current_file_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file_percent: Option<f64>,
}

impl JobProgress {
    pub fn clear_transient(&mut self) {
        self.current_speed = None;
        self.current_file_size = None;
        self.current_file_percent = None;
    }
}

/// One batch submission. Serialized in camelCase; legacy flat-file keys are
/// accepted as aliases so old job lists import cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub target_container: Option<String>,
    #[serde(alias = "concurrentFragments", default = "default_parallelism")]
    pub parallelism: u32,
    #[serde(alias = "addPrefix", default)]
    pub number_items: bool,
    #[serde(alias = "tempDir")]
    pub destination_dir: PathBuf,
    #[serde(default)]
    pub files: Vec<JobFile>,
    #[serde(default)]
    pub status: JobStatus,
    /// Unix milliseconds; also embedded in `id`.
    pub created_at: i64,
    #[serde(default)]
    pub progress: JobProgress,
}

fn default_playlist_name() -> String {
    "batch".to_string()
}

fn default_format() -> String {
    "best".to_string()
}

fn default_parallelism() -> u32 {
    4
}

impl Job {
    /// Number of files whose status is `completed`.
    pub fn completed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .count()
    }

    /// Re-derive `progress.total` and `progress.completed` from `files`.
    pub fn refresh_counts(&mut self) {
        self.progress.total = self.files.len();
        self.progress.completed = self.completed_count();
    }

    /// Index of the first file not yet completed; 0 when every file is done.
    pub fn resume_index(&self) -> usize {
        self.files
            .iter()
            .position(|f| f.status != FileStatus::Completed)
            .unwrap_or(0)
    }

    pub fn all_completed(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|f| f.status == FileStatus::Completed)
    }
}
