//! A shell-script stand-in for the extraction engine (unix only).
//!
//! Behaviour is keyed on the URL prefix:
//! - `fail*`: prints an engine error to stderr, exits 1, writes nothing
//! - `salvage*`: writes `<base>.mkv` instead of the requested name, exits 1
//! - `pause*`: on first run writes `<out>.part`, prints one progress line and sleeps;
//!   later runs succeed
//! - `hold*`: prints one progress line and blocks until `release()` is called
//! - anything else: prints progress, writes the requested output, exits 0
//!
//! Every invocation appends its URL to `invocations.log`.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mediapull_core::engine::EngineLauncher;
use mediapull_core::job_db::{Job, JobDb};
use mediapull_core::progress::ProgressHub;
use mediapull_core::retry::{Backoff, RetryPolicy};
use mediapull_core::{Supervisor, SupervisorSettings};
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
dir='@DIR@'
if [ "$1" = "-U" ]; then
  echo "Latest version: 2099.01.01"
  echo "yt-dlp is up to date"
  exit 0
fi
url="$1"
if [ "$2" = "--dump-single-json" ]; then
  printf '{"title":"Probe","webpage_url":"%s","entries":[]}\n' "$url"
  exit 0
fi
out="$3"
echo "$url" >> "$dir/invocations.log"
case "$url" in
  fail*)
    echo "ERROR: [generic] Unsupported URL: $url" >&2
    exit 1
    ;;
  salvage*)
    echo "[download] 100% of 4.00B in 00:00:01"
    printf 'data' > "${out%.*}.mkv"
    echo "ERROR: Postprocessing: conversion failed" >&2
    exit 1
    ;;
  pause*)
    if [ ! -f "$dir/seen-$url" ]; then
      printf 'da' > "$out.part"
      : > "$dir/seen-$url"
      echo "[download]   1.0% of 4.00B at 10.00KiB/s ETA 00:30"
      exec sleep 30
    fi
    ;;
  hold*)
    echo "[download]   1.0% of 4.00B at 10.00KiB/s ETA 00:30"
    while [ ! -f "$dir/release" ]; do sleep 0.05; done
    ;;
esac
echo "[download]  50.0% of 4.00B at 1.00KiB/s ETA 00:01"
printf 'data' > "$out"
rm -f "$out.part"
echo "[download] 100% of 4.00B in 00:00:01"
exit 0
"#;

pub struct FakeEngine {
    dir: TempDir,
    path: PathBuf,
}

impl FakeEngine {
    pub fn install() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yt-dlp");
        let script = SCRIPT.replace("@DIR@", &dir.path().display().to_string());
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URLs the engine was started for, in order.
    pub fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("invocations.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether a `pause*` URL has started its first (blocking) run.
    pub fn seen(&self, url: &str) -> bool {
        self.dir.path().join(format!("seen-{url}")).exists()
    }

    /// Let every `hold*` URL finish.
    pub fn release(&self) {
        std::fs::write(self.dir.path().join("release"), b"").unwrap();
    }
}

fn quick(max_attempts: u32, backoff: Backoff) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff,
    }
}

/// A supervisor over `engine` with its store in `state` and output under `root`.
pub async fn supervisor(engine: &FakeEngine, state: &Path, root: &Path) -> Supervisor {
    let db = JobDb::open_at(state.join("jobs.db")).await.unwrap();
    let hub = ProgressHub::new();
    let launcher = EngineLauncher::new(engine.path().to_path_buf(), None, hub.clone())
        .with_spawn_policy(quick(5, Backoff::Linear))
        .with_ready_timeout(Duration::from_secs(2))
        .with_poll_interval(Duration::from_millis(20));
    let settings = SupervisorSettings {
        download_root: root.to_path_buf(),
        proxy: None,
        cookie_file: state.join("cookies.txt"),
        embed_metadata: false,
        embed_thumbnail: false,
        default_parallelism: 4,
        move_policy: quick(3, Backoff::Fixed),
    };
    Supervisor::new(db, launcher, hub, settings)
}

/// Poll the job until `pred` holds; panics after five seconds.
pub async fn wait_for<F>(sup: &Supervisor, id: &str, pred: F) -> Job
where
    F: Fn(&Job) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let job = sup.job_status(id).await.unwrap();
        if pred(&job) {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting on job {id}: {job:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

