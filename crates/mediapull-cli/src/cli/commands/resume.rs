//! `mediapull resume <id>...` – run jobs in the foreground.
//!
//! Hosts the control socket so `mediapull pause` from another shell reaches
//! the live engine process. When no other runner answers on the socket, jobs
//! left `downloading` by a crashed run are reset first. Ctrl-C pauses every
//! job this process is running.

use anyhow::Result;
use mediapull_core::job_db::{Job, JobStatus};
use mediapull_core::{config, Supervisor};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::cli::control_socket;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run_resume(sup: &Supervisor, ids: &[String]) -> Result<()> {
    let socket_path = config::control_socket_path().ok();
    let mut listener = None;
    match &socket_path {
        Some(path) if control_socket::runner_alive(path).await => {
            tracing::info!("another runner owns the control socket; skipping crash recovery");
        }
        _ => {
            let recovered = sup.recover_interrupted().await?;
            if recovered > 0 {
                println!("Recovered {recovered} interrupted job(s)");
            }
            if let Some(path) = &socket_path {
                match control_socket::spawn_control_listener(sup.clone(), path) {
                    Ok(handle) => listener = Some(handle),
                    Err(e) => tracing::warn!(path = %path.display(), "control socket bind: {:#}", e),
                }
            }
        }
    }

    let printer = tokio::spawn(print_progress(sup.hub().subscribe(), ids.to_vec()));

    let mut set = JoinSet::new();
    for id in ids {
        let sup = sup.clone();
        let id = id.clone();
        set.spawn(async move {
            let result = sup.run_job(&id).await;
            (id, result)
        });
    }

    let mut failures = 0usize;
    loop {
        tokio::select! {
            next = set.join_next() => match next {
                None => break,
                Some(Ok((id, Ok(status)))) => match status {
                    JobStatus::Downloading => println!("Job {id} is already running"),
                    other => println!("Job {id}: {other}"),
                },
                Some(Ok((id, Err(e)))) => {
                    eprintln!("Job {id}: {e}");
                    failures += 1;
                }
                Some(Err(e)) => {
                    eprintln!("job task failed: {e}");
                    failures += 1;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Pausing...");
                for id in ids {
                    if let Err(e) = sup.pause_job(id).await {
                        tracing::warn!(job_id = %id, "pause on interrupt failed: {}", e);
                    }
                }
            }
        }
    }

    printer.abort();
    if let Some(handle) = listener {
        handle.abort();
        if let Some(path) = &socket_path {
            let _ = std::fs::remove_file(path);
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} job(s) could not be run");
    }
    Ok(())
}

fn progress_line(job: &Job) -> String {
    let p = &job.progress;
    let mut line = format!(
        "  [{}] {}/{} done, item {}",
        job.id,
        p.completed,
        p.total,
        p.current_file_index + 1
    );
    if let Some(pct) = p.current_file_percent {
        line.push_str(&format!("  {pct:.1}%"));
    }
    if let Some(size) = &p.current_file_size {
        line.push_str(&format!(" of {size}"));
    }
    if let Some(speed) = &p.current_speed {
        line.push_str(&format!(" at {speed}"));
    }
    line
}

/// Print throttled progress for the jobs this process runs.
async fn print_progress(mut rx: broadcast::Receiver<Job>, ids: Vec<String>) {
    let mut last_print: HashMap<String, Instant> = HashMap::new();
    loop {
        let job = match rx.recv().await {
            Ok(job) => job,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if !ids.contains(&job.id) {
            continue;
        }
        let now = Instant::now();
        let due = last_print
            .get(&job.id)
            .map_or(true, |t| now.duration_since(*t) >= PROGRESS_INTERVAL);
        // Item transitions always print; percent ticks are throttled.
        if due || job.progress.current_file_percent.is_none() {
            println!("{}", progress_line(&job));
            last_print.insert(job.id.clone(), now);
        }
    }
}
