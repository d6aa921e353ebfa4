//! Progress channel: one-way push of job snapshots and launch-health events.
//!
//! Delivery is best-effort: sends never block and are dropped when nobody
//! subscribes or a subscriber lags. The job store stays the source of truth,
//! so subscribers must tolerate duplicate or skipped snapshots.

use tokio::sync::broadcast;

use crate::engine::LaunchHealth;
use crate::job_db::Job;

const JOB_CHANNEL_CAPACITY: usize = 256;
const HEALTH_CHANNEL_CAPACITY: usize = 32;

/// Fan-out hub for job snapshots and engine launch health.
#[derive(Clone)]
pub struct ProgressHub {
    jobs: broadcast::Sender<Job>,
    health: broadcast::Sender<LaunchHealth>,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        let (jobs, _) = broadcast::channel(JOB_CHANNEL_CAPACITY);
        let (health, _) = broadcast::channel(HEALTH_CHANNEL_CAPACITY);
        Self { jobs, health }
    }

    /// Receive a full `Job` snapshot on every persisted transition and percent update.
    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.jobs.subscribe()
    }

    pub fn subscribe_health(&self) -> broadcast::Receiver<LaunchHealth> {
        self.health.subscribe()
    }

    pub fn send_job(&self, job: Job) {
        // No receivers is fine.
        let _ = self.jobs.send(job);
    }

    pub fn send_health(&self, event: LaunchHealth) {
        tracing::trace!(binary = %event.binary, status = ?event.status, "{}", event.message);
        let _ = self.health.send(event);
    }
}
