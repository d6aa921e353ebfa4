//! In-memory registry of referenced jobs and live engine processes.
//!
//! While a job is referenced (being supervised, paused, or queried) its `Job`
//! lives here behind a mutex, so in-flight progress is visible to status and
//! list queries before it is persisted. Each running subprocess is registered
//! with a kill switch; `pause` fires it and the supervision loop kills the child.
//! A loop guard marks which jobs have a supervision loop still running, so a
//! resume that races an unwinding loop waits for it instead of starting a
//! second one. Writes of one job's snapshots to the store pass through a
//! per-job gate so they land in the order their snapshots were taken.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::{Mutex as AsyncMutex, Notify};

use crate::job_db::{Job, JobDb};

/// A job shared between its supervision loop and concurrent queries.
pub type SharedJob = Arc<Mutex<Job>>;

/// Lock a shared job, recovering the data if a holder panicked.
pub fn lock_job(job: &SharedJob) -> MutexGuard<'_, Job> {
    job.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One-shot kill request for a running subprocess.
#[derive(Debug, Default)]
pub struct KillSwitch {
    fired: AtomicBool,
    notify: Notify,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once `fire` has been called (immediately if it already was).
    pub async fn fired(&self) {
        if self.is_fired() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Job id → cached job, job id → live subprocess kill switch, and the ids
/// currently owned by a supervision loop.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, SharedJob>>,
    processes: RwLock<HashMap<String, Arc<KillSwitch>>>,
    loops: Mutex<HashSet<String>>,
    loop_released: Notify,
    write_gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held by a supervision loop for its whole run; releases the id on drop.
pub struct LoopGuard {
    registry: Arc<JobRegistry>,
    id: String,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.registry
            .loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        self.registry.loop_released.notify_waiters();
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached copy of a job, if one is referenced.
    pub fn get(&self, id: &str) -> Option<SharedJob> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Cache a freshly created job, returning the shared handle.
    pub fn insert(&self, job: Job) -> SharedJob {
        let id = job.id.clone();
        let shared = Arc::new(Mutex::new(job));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&shared));
        shared
    }

    /// Return the cached job, loading and caching it from the store on a miss.
    /// Concurrent loads of the same id converge on one shared instance.
    pub async fn get_or_load(&self, db: &JobDb, id: &str) -> Result<Option<SharedJob>> {
        if let Some(job) = self.get(id) {
            return Ok(Some(job));
        }
        let Some(job) = db.get_job(id).await? else {
            return Ok(None);
        };
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let shared = jobs
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(job)));
        Ok(Some(Arc::clone(shared)))
    }

    /// Clone of the cached job, if any.
    pub fn snapshot(&self, id: &str) -> Option<Job> {
        self.get(id).map(|j| lock_job(&j).clone())
    }

    /// Register a live subprocess for `id`; returns the switch the loop waits on.
    pub fn register_process(&self, id: &str) -> Arc<KillSwitch> {
        let switch = Arc::new(KillSwitch::new());
        self.processes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Arc::clone(&switch));
        switch
    }

    /// Unregister the subprocess (call when it exits, success or failure).
    pub fn unregister_process(&self, id: &str) {
        self.processes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn has_process(&self, id: &str) -> bool {
        self.processes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Fire the kill switch of the live subprocess, if any. Returns whether one was live.
    pub fn kill(&self, id: &str) -> bool {
        match self
            .processes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            Some(switch) => {
                switch.fire();
                true
            }
            None => false,
        }
    }

    /// Mark `id` as owned by a loop. `None` if another loop still owns it.
    pub fn begin_loop(self: &Arc<Self>, id: &str) -> Option<LoopGuard> {
        let mut loops = self.loops.lock().unwrap_or_else(PoisonError::into_inner);
        if !loops.insert(id.to_string()) {
            return None;
        }
        Some(LoopGuard {
            registry: Arc::clone(self),
            id: id.to_string(),
        })
    }

    pub fn is_supervised(&self, id: &str) -> bool {
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Wait until no loop owns `id`. Returns at once when none does.
    pub async fn loop_released(&self, id: &str) {
        loop {
            let released = self.loop_released.notified();
            tokio::pin!(released);
            // Register interest before checking so a drop in between is not missed.
            released.as_mut().enable();
            if !self.is_supervised(id) {
                return;
            }
            released.await;
        }
    }

    /// Gate serialising store writes for `id`. Hold it from taking the
    /// snapshot until the write has committed.
    pub fn write_gate(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self.write_gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(id.to_string()).or_default())
    }

    /// Drop the cached job and any process handle.
    pub fn forget(&self, id: &str) {
        self.unregister_process(id);
        self.write_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}
