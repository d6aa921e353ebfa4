//! One item: spawn the engine, stream its progress, judge and place the output.

use std::process::ExitStatus;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr};

use super::{status_of, Supervisor};
use crate::engine::{explain_failure, parse_progress_line, Invocation};
use crate::job_db::JobStatus;
use crate::registry::{lock_job, KillSwitch, SharedJob};
use crate::staging;

/// Stderr kept per item for failure reporting.
const STDERR_TAIL_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ItemOutcome {
    /// `filename` is the name the output was moved under, when one was found.
    Completed { filename: Option<String> },
    Failed,
    Paused,
}

struct ItemPlan {
    url: String,
    filename: String,
    format: String,
    target_container: Option<String>,
    parallelism: u32,
    destination: std::path::PathBuf,
}

impl Supervisor {
    pub(super) async fn run_item(&self, id: &str, shared: &SharedJob, index: usize) -> ItemOutcome {
        let plan = {
            let job = lock_job(shared);
            let file = &job.files[index];
            ItemPlan {
                url: file.url.clone(),
                filename: file.filename.clone(),
                format: job.format.clone(),
                target_container: job.target_container.clone(),
                parallelism: job.parallelism,
                destination: job.destination_dir.clone(),
            }
        };

        let staging_dir = match staging::ensure_staging(&plan.destination).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::error!(job_id = %id, index, "{e:#}");
                return ItemOutcome::Failed;
            }
        };
        let output = staging_dir.join(&plan.filename);
        let args = Invocation {
            url: &plan.url,
            output: &output,
            format: &plan.format,
            target_container: plan.target_container.as_deref(),
            parallelism: plan.parallelism,
            proxy: self.settings.proxy.as_deref(),
            cookies: self.settings.cookies(),
            transcoder: self.launcher.transcoder(),
            embed_metadata: self.settings.embed_metadata,
            embed_thumbnail: self.settings.embed_thumbnail,
        }
        .build();
        tracing::debug!(job_id = %id, index, binary = %self.launcher.extractor().display(), ?args, "spawning engine");

        // Register before re-checking status: a pause that lands in between
        // either sees the switch or is seen here.
        let switch = self.registry.register_process(id);
        if status_of(shared) == JobStatus::Paused {
            self.registry.unregister_process(id);
            return ItemOutcome::Paused;
        }

        let mut child = match self.launcher.spawn(&args).await {
            Ok(child) => child,
            Err(e) => {
                self.registry.unregister_process(id);
                tracing::error!(job_id = %id, index, "{e}");
                return ItemOutcome::Failed;
            }
        };

        let stderr_task = child.stderr.take().map(|s| tokio::spawn(read_tail(s)));
        let exit = self.stream_until_exit(shared, &mut child, &switch).await;
        self.registry.unregister_process(id);
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        let status = match exit {
            Some(status) if status_of(shared) != JobStatus::Paused => status,
            _ => {
                tracing::info!(job_id = %id, index, "engine stopped by pause");
                return ItemOutcome::Paused;
            }
        };

        tracing::info!(job_id = %id, index, code = ?status.code(), "engine exited");
        let found = staging::find_output(&staging_dir, &plan.filename);
        if !status.success() {
            match &found {
                Some(path) => tracing::warn!(
                    job_id = %id,
                    index,
                    code = ?status.code(),
                    output = %path.display(),
                    "non-zero exit but output is present; keeping it"
                ),
                None => {
                    tracing::warn!(job_id = %id, index, url = %plan.url, "item failed: {}", explain_failure(&stderr));
                    return ItemOutcome::Failed;
                }
            }
        }

        let Some(src) = found else {
            tracing::warn!(job_id = %id, index, "engine reported success but no output was found in staging");
            return ItemOutcome::Completed { filename: None };
        };
        match staging::move_to_destination(&src, &plan.destination, &self.settings.move_policy).await {
            Ok(dest) => {
                staging::remove_dir_if_empty(&staging_dir).await;
                let filename = dest.file_name().map(|n| n.to_string_lossy().into_owned());
                ItemOutcome::Completed { filename }
            }
            Err(e) => {
                tracing::error!(job_id = %id, index, "{e:#}");
                ItemOutcome::Failed
            }
        }
    }

    /// Read stdout line by line until the engine exits or the kill switch
    /// fires. `None` means the process was killed.
    async fn stream_until_exit(
        &self,
        shared: &SharedJob,
        child: &mut Child,
        switch: &Arc<KillSwitch>,
    ) -> Option<ExitStatus> {
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = switch.fired() => {
                        let _ = child.kill().await;
                        return None;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => self.apply_progress(shared, &line),
                        Ok(None) => break,
                        Err(e) => {
                            tracing::debug!("engine stdout read failed: {e}");
                            break;
                        }
                    }
                }
            }
        }
        tokio::select! {
            _ = switch.fired() => {
                let _ = child.kill().await;
                None
            }
            status = child.wait() => status.ok(),
        }
    }

    fn apply_progress(&self, shared: &SharedJob, line: &str) {
        let Some(progress) = parse_progress_line(line) else {
            return;
        };
        let snapshot = {
            let mut job = lock_job(shared);
            if let Some(size) = progress.total_size {
                job.progress.current_file_size = Some(size);
            }
            if let Some(speed) = progress.speed {
                job.progress.current_speed = Some(speed);
            }
            progress.percent.map(|p| {
                job.progress.current_file_percent = Some(p);
                job.clone()
            })
        };
        // Only percent updates are pushed, to bound broadcast volume.
        if let Some(job) = snapshot {
            self.hub.send_job(job);
        }
    }
}

/// Collect stderr, keeping only the last `STDERR_TAIL_BYTES`.
async fn read_tail(mut stderr: ChildStderr) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let excess = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}
