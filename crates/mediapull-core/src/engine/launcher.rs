//! Readiness polling and retrying spawn for the extraction engine.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::config::MediaPullConfig;
use crate::progress::ProgressHub;
use crate::retry::{self, ErrorKind, RetryPolicy};

use super::health::LaunchHealth;
use super::locate::{resolve, EngineKind};
use super::EngineError;

/// Cadence of "preparing" events while waiting for the binary.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Locates and launches the engine binaries.
#[derive(Clone)]
pub struct EngineLauncher {
    extractor: PathBuf,
    transcoder: Option<PathBuf>,
    spawn_policy: RetryPolicy,
    ready_timeout: Duration,
    poll_interval: Duration,
    hub: ProgressHub,
}

impl EngineLauncher {
    pub fn new(extractor: PathBuf, transcoder: Option<PathBuf>, hub: ProgressHub) -> Self {
        Self {
            extractor,
            transcoder,
            spawn_policy: RetryPolicy::spawn_default(),
            ready_timeout: Duration::from_secs(30),
            poll_interval: READY_POLL_INTERVAL,
            hub,
        }
    }

    /// Resolve both binaries from config. A transcoder that cannot be resolved is
    /// simply left out; an unresolvable extractor is a configuration error.
    pub fn from_config(cfg: &MediaPullConfig, hub: ProgressHub) -> Result<Self, EngineError> {
        let extractor = resolve(EngineKind::Extractor, cfg.engine.extractor_path.as_deref())?;
        let transcoder = resolve(EngineKind::Transcoder, cfg.engine.transcoder_path.as_deref()).ok();
        Ok(Self::new(extractor, transcoder, hub)
            .with_spawn_policy(cfg.retry.spawn_policy())
            .with_ready_timeout(cfg.ready_timeout()))
    }

    pub fn with_spawn_policy(mut self, policy: RetryPolicy) -> Self {
        self.spawn_policy = policy;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn extractor(&self) -> &Path {
        &self.extractor
    }

    /// Transcoder path, only when it exists on disk.
    pub fn transcoder(&self) -> Option<&Path> {
        self.transcoder.as_deref().filter(|p| p.is_file())
    }

    fn binary_label(&self) -> String {
        self.extractor
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| EngineKind::Extractor.label().to_string())
    }

    /// Wait until the extractor exists and can be opened, polling at about 1s.
    /// Emits a `retrying` health event per poll while waiting.
    pub async fn wait_until_ready(&self) -> Result<(), EngineError> {
        let label = self.binary_label();
        let start = tokio::time::Instant::now();
        let mut polls = 0u32;
        loop {
            if is_ready(&self.extractor) {
                if polls > 0 {
                    self.hub.send_health(LaunchHealth::ready(&label));
                }
                return Ok(());
            }
            let waited = start.elapsed();
            if waited >= self.ready_timeout {
                let err = EngineError::NotReady {
                    binary: self.extractor.display().to_string(),
                    waited,
                };
                self.hub.send_health(LaunchHealth::error(&label, err.to_string()));
                return Err(err);
            }
            polls += 1;
            tracing::debug!(binary = %self.extractor.display(), polls, "engine not ready yet");
            self.hub.send_health(LaunchHealth::retrying(
                &label,
                format!("preparing {label}"),
                polls,
                None,
            ));
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Spawn the extractor with `args`, stdout/stderr piped, retrying transient
    /// lock/busy failures per the spawn policy.
    pub async fn spawn(&self, args: &[OsString]) -> Result<Child, EngineError> {
        let label = self.binary_label();
        let max = self.spawn_policy.max_attempts;
        let mut attempts = 0u32;

        let result = retry::run_with_retry(
            &self.spawn_policy,
            |_| {
                let binary = self.extractor.as_path();
                async move {
                    check_exclusive(binary)?;
                    Command::new(binary)
                        .args(args)
                        .stdin(Stdio::null())
                        .stdout(Stdio::piped())
                        .stderr(Stdio::piped())
                        .kill_on_drop(true)
                        .spawn()
                }
            },
            |e: &io::Error, attempt| {
                attempts = attempt;
                let kind = retry::classify_io_error(e);
                if kind == ErrorKind::Transient && attempt < max {
                    tracing::warn!(binary = %label, attempt, max, "engine busy, retrying: {}", e);
                    self.hub.send_health(LaunchHealth::retrying(
                        &label,
                        format!("{label} is busy ({e}), retrying"),
                        attempt,
                        Some(max),
                    ));
                }
                kind
            },
        )
        .await;

        match result {
            Ok(child) => {
                self.hub.send_health(LaunchHealth::ready(&label));
                Ok(child)
            }
            Err(source) => {
                let err = EngineError::SpawnFailed {
                    binary: self.extractor.display().to_string(),
                    attempts: attempts.max(1),
                    source,
                };
                tracing::error!("{}", err);
                self.hub.send_health(LaunchHealth::error(&label, err.to_string()));
                Err(err)
            }
        }
    }
}

/// The binary exists and can be opened (exclusively, on Windows).
fn is_ready(path: &Path) -> bool {
    path.is_file() && check_exclusive(path).is_ok() && std::fs::File::open(path).is_ok()
}

/// On Windows, a freshly written or scanned executable may still be held open;
/// opening it with no sharing surfaces that as a sharing violation.
#[cfg(windows)]
fn check_exclusive(path: &Path) -> io::Result<()> {
    use std::os::windows::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .read(true)
        .share_mode(0)
        .open(path)
        .map(drop)
}

#[cfg(not(windows))]
fn check_exclusive(_path: &Path) -> io::Result<()> {
    Ok(())
}
