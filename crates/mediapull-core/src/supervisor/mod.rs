//! Job supervisor: turns a batch of URLs into a durable, resumable job and
//! drives the engine over its items one at a time.
//!
//! State lives in three places. The job store is the source of truth, the
//! registry holds the live copy that in-flight progress mutates, and the
//! progress hub receives a snapshot after every persisted transition. At most
//! one supervision loop runs per job id: a resume must take the registry's
//! loop guard and then flip the live copy's status under its lock.

mod control;
mod create;
mod item;
mod run;
mod shell;

pub use create::NewJob;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, MediaPullConfig};
use crate::engine::EngineLauncher;
use crate::job_db::{Job, JobDb, JobStatus};
use crate::progress::ProgressHub;
use crate::registry::{lock_job, JobRegistry, SharedJob};
use crate::retry::RetryPolicy;

/// Per-process knobs the supervisor hands to the engine and the file mover.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Jobs without a folder hint write here; never removed on delete.
    pub download_root: PathBuf,
    pub proxy: Option<String>,
    /// Passed to the engine only while the file exists.
    pub cookie_file: PathBuf,
    pub embed_metadata: bool,
    pub embed_thumbnail: bool,
    pub default_parallelism: u32,
    pub move_policy: RetryPolicy,
}

impl SupervisorSettings {
    pub fn from_config(cfg: &MediaPullConfig) -> Result<Self> {
        let cookie_file = match &cfg.cookie_file {
            Some(p) => p.clone(),
            None => config::default_cookie_path()?,
        };
        Ok(Self {
            download_root: cfg.resolved_download_root()?,
            proxy: cfg.proxy().map(str::to_string),
            cookie_file,
            embed_metadata: cfg.embed_metadata,
            embed_thumbnail: cfg.embed_thumbnail,
            default_parallelism: cfg.default_parallelism.max(1),
            move_policy: cfg.retry.move_policy(),
        })
    }

    pub(crate) fn cookies(&self) -> Option<&std::path::Path> {
        Some(self.cookie_file.as_path()).filter(|p| p.is_file())
    }
}

/// Owns the job lifecycle. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Supervisor {
    db: JobDb,
    registry: Arc<JobRegistry>,
    launcher: EngineLauncher,
    hub: ProgressHub,
    settings: Arc<SupervisorSettings>,
}

impl Supervisor {
    pub fn new(
        db: JobDb,
        launcher: EngineLauncher,
        hub: ProgressHub,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            db,
            registry: Arc::new(JobRegistry::new()),
            launcher,
            hub,
            settings: Arc::new(settings),
        }
    }

    /// Use a caller-owned registry instead of a private one.
    pub fn with_registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &ProgressHub {
        &self.hub
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn db(&self) -> &JobDb {
        &self.db
    }

    /// Persist the shared job's current state, then broadcast it.
    /// Returns false once the row is gone (job deleted under the loop).
    ///
    /// The snapshot is taken under the job's write gate, so concurrent
    /// persists (the loop and a pause) commit in snapshot order and the row
    /// always ends at the newest state.
    async fn persist(&self, shared: &SharedJob) -> bool {
        let id = lock_job(shared).id.clone();
        let gate = self.registry.write_gate(&id);
        let _held = gate.lock().await;
        let snapshot = {
            let mut job = lock_job(shared);
            job.refresh_counts();
            job.clone()
        };
        match self.db.update_job(&snapshot).await {
            Ok(true) => {
                self.hub.send_job(snapshot);
                true
            }
            Ok(false) => {
                tracing::debug!(job_id = %snapshot.id, "job row no longer exists");
                false
            }
            Err(e) => {
                tracing::error!(job_id = %snapshot.id, "failed to persist job: {e:#}");
                self.hub.send_job(snapshot);
                true
            }
        }
    }
}

fn status_of(shared: &SharedJob) -> JobStatus {
    lock_job(shared).status
}

fn snapshot_of(shared: &SharedJob) -> Job {
    lock_job(shared).clone()
}

#[cfg(test)]
mod tests;
