use std::path::{Path, PathBuf};
use std::time::Duration;

use super::*;
use crate::error::JobError;
use crate::job_db::{open_memory, FileStatus};
use crate::retry::Backoff;

fn settings(root: &Path) -> SupervisorSettings {
    SupervisorSettings {
        download_root: root.to_path_buf(),
        proxy: None,
        cookie_file: root.join("state/cookies.txt"),
        embed_metadata: false,
        embed_thumbnail: false,
        default_parallelism: 4,
        move_policy: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            backoff: Backoff::Fixed,
        },
    }
}

async fn supervisor(root: &Path) -> Supervisor {
    let db = open_memory().await.unwrap();
    let hub = ProgressHub::new();
    let launcher = EngineLauncher::new(PathBuf::from("/nonexistent/yt-dlp"), None, hub.clone())
        .with_ready_timeout(Duration::from_millis(20))
        .with_poll_interval(Duration::from_millis(5));
    Supervisor::new(db, launcher, hub, settings(root))
}

fn batch(urls: &[&str], titles: &[&str]) -> NewJob {
    NewJob {
        urls: urls.iter().map(|s| s.to_string()).collect(),
        titles: titles.iter().map(|s| s.to_string()).collect(),
        format: "best".into(),
        number_items: true,
        ..NewJob::default()
    }
}

#[tokio::test]
async fn create_job_plans_numbered_names() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup
        .create_job(batch(&["urlA", "urlB"], &["Title A", "Title B"]))
        .await
        .unwrap();

    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Idle);
    assert_eq!(job.progress.total, 2);
    assert_eq!(job.progress.completed, 0);
    let names: Vec<_> = job.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["01 - Title A.mp4", "02 - Title B.mp4"]);
    assert!(job.files.iter().all(|f| f.status == FileStatus::Pending));
}

#[tokio::test]
async fn repeated_create_avoids_collisions() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let req = batch(&["urlA", "urlB"], &["Title A", "Title B"]);
    let first = sup.create_job(req.clone()).await.unwrap();
    let second = sup.create_job(req).await.unwrap();
    assert_ne!(first, second);

    let job = sup.job_status(&second).await.unwrap();
    let names: Vec<_> = job.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["01 - Title A (1).mp4", "02 - Title B (1).mp4"]);
}

#[tokio::test]
async fn create_rejects_empty_batches() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let err = sup.create_job(NewJob::default()).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidRequest(_)));
    let err = sup.create_job(batch(&["urlA", "  "], &[])).await.unwrap_err();
    assert!(matches!(err, JobError::InvalidRequest(_)));
}

#[tokio::test]
async fn folder_hint_and_audio_extension() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup
        .create_job(NewJob {
            urls: vec!["urlA".into()],
            titles: vec!["Song: Live?".into()],
            format: "bestaudio".into(),
            folder: Some("My/Mix".into()),
            ..NewJob::default()
        })
        .await
        .unwrap();
    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(job.destination_dir, root.path().join("My_Mix"));
    assert!(job.destination_dir.is_dir());
    assert_eq!(job.files[0].filename, "Song_ Live_.mp3");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    assert!(sup.resume_job("nope").await.unwrap_err().is_not_found());
    assert!(sup.pause_job("nope").await.unwrap_err().is_not_found());
    assert!(sup.job_status("nope").await.unwrap_err().is_not_found());
    assert!(sup.delete_job("nope", false).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn pause_is_idempotent_without_a_process() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup.create_job(batch(&["urlA"], &["A"])).await.unwrap();
    assert_eq!(sup.pause_job(&id).await.unwrap(), JobStatus::Paused);
    assert_eq!(sup.pause_job(&id).await.unwrap(), JobStatus::Paused);
    let stored = sup.db().get_job(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Paused);
}

#[tokio::test]
async fn engine_never_ready_marks_job_error() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup.create_job(batch(&["urlA"], &["A"])).await.unwrap();
    let err = sup.run_job(&id).await.unwrap_err();
    assert!(matches!(err, JobError::Engine(_)));
    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.files[0].status, FileStatus::Pending);
}

#[tokio::test]
async fn list_prefers_live_copies() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup.create_job(batch(&["urlA"], &["A"])).await.unwrap();
    let shared = sup.registry().get_or_load(sup.db(), &id).await.unwrap().unwrap();
    lock_job(&shared).progress.current_speed = Some("1.0MiB/s".into());

    let listed = sup.list_jobs(None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].progress.current_speed.as_deref(), Some("1.0MiB/s"));
}

#[tokio::test]
async fn delete_removes_row_and_empty_folder() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup
        .create_job(NewJob {
            folder: Some("set".into()),
            ..batch(&["urlA"], &["A"])
        })
        .await
        .unwrap();
    let dir = root.path().join("set");
    assert!(dir.is_dir());

    sup.delete_job(&id, true).await.unwrap();
    assert!(sup.job_status(&id).await.unwrap_err().is_not_found());
    assert!(!dir.exists());
    assert!(root.path().exists());
}

#[tokio::test]
async fn cookies_are_written_and_cleared() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    assert!(sup.settings().cookies().is_none());

    sup.save_cookies("# Netscape HTTP Cookie File\n").await.unwrap();
    assert!(sup.settings().cookies().is_some());

    sup.save_cookies("   \n").await.unwrap();
    assert!(sup.settings().cookies().is_none());
    // Clearing twice is fine.
    sup.save_cookies("").await.unwrap();
}

#[tokio::test]
async fn concurrent_persists_leave_the_newest_state() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    let id = sup
        .create_job(batch(&["urlA", "urlB", "urlC"], &[]))
        .await
        .unwrap();
    let shared = sup.registry().get_or_load(sup.db(), &id).await.unwrap().unwrap();

    let mut writers = tokio::task::JoinSet::new();
    for i in 0..32usize {
        let sup = sup.clone();
        let shared = Arc::clone(&shared);
        writers.spawn(async move {
            {
                let mut job = lock_job(&shared);
                job.status = if i % 2 == 0 {
                    JobStatus::Paused
                } else {
                    JobStatus::Downloading
                };
                job.progress.current_file_index = i % 3;
            }
            sup.persist(&shared).await
        });
    }
    while let Some(written) = writers.join_next().await {
        assert!(written.unwrap());
    }

    let live = snapshot_of(&shared);
    let stored = sup.db().get_job(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, live.status);
    assert_eq!(
        stored.progress.current_file_index,
        live.progress.current_file_index
    );
}

#[tokio::test]
async fn dot_folder_hints_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(root.path()).await;
    for hint in ["..", ".", " ... "] {
        let err = sup
            .create_job(NewJob {
                folder: Some(hint.into()),
                ..batch(&["urlA"], &["A"])
            })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)), "{hint:?}");
    }
    assert!(sup.list_jobs(None).await.unwrap().is_empty());
}
