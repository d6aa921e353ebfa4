//! Integration tests: drive the supervisor against a scripted fake engine.

#![cfg(unix)]

mod common;

use common::fake_engine::{supervisor, wait_for, FakeEngine};
use mediapull_core::job_db::{FileStatus, Job, JobStatus};
use mediapull_core::NewJob;

fn batch(urls: &[&str], titles: &[&str]) -> NewJob {
    NewJob {
        urls: urls.iter().map(|s| s.to_string()).collect(),
        titles: titles.iter().map(|s| s.to_string()).collect(),
        format: "best".into(),
        number_items: true,
        ..NewJob::default()
    }
}

fn statuses(job: &Job) -> Vec<FileStatus> {
    job.files.iter().map(|f| f.status).collect()
}

#[tokio::test]
async fn items_complete_in_order() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;
    let mut rx = sup.hub().subscribe();

    let id = sup
        .create_job(batch(&["urlA", "urlB"], &["Title A", "Title B"]))
        .await
        .unwrap();
    assert_eq!(sup.run_job(&id).await.unwrap(), JobStatus::Completed);

    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(statuses(&job), vec![FileStatus::Completed, FileStatus::Completed]);
    assert_eq!(job.progress.completed, 2);
    assert_eq!(std::fs::read(root.path().join("01 - Title A.mp4")).unwrap(), b"data");
    assert_eq!(std::fs::read(root.path().join("02 - Title B.mp4")).unwrap(), b"data");
    assert!(!root.path().join(".incomplete").exists());
    assert_eq!(engine.invocations(), vec!["urlA", "urlB"]);

    let mut snapshots = Vec::new();
    while let Ok(job) = rx.try_recv() {
        snapshots.push(job);
    }
    for snap in &snapshots {
        let done = snap.files.iter().filter(|f| f.status == FileStatus::Completed).count();
        assert_eq!(snap.progress.completed, done);
        assert_eq!(snap.progress.total, 2);
    }
    let second_started = snapshots
        .iter()
        .find(|s| s.files[1].status == FileStatus::Downloading)
        .expect("second item was broadcast as downloading");
    assert_eq!(second_started.files[0].status, FileStatus::Completed);
    assert!(snapshots
        .iter()
        .any(|s| s.progress.current_file_percent == Some(50.0)));
}

#[tokio::test]
async fn pause_then_resume_restarts_the_interrupted_item() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup
        .create_job(batch(&["urlA", "pause-urlB"], &["Title A", "Title B"]))
        .await
        .unwrap();
    assert_eq!(sup.resume_job(&id).await.unwrap(), JobStatus::Downloading);

    wait_for(&sup, &id, |j| j.files[1].status == FileStatus::Downloading).await;
    while !engine.seen("pause-urlB") {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sup.pause_job(&id).await.unwrap(), JobStatus::Paused);

    let paused = wait_for(&sup, &id, |j| j.files[1].status == FileStatus::Pending).await;
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.files[0].status, FileStatus::Completed);
    while sup.registry().is_supervised(&id) {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(!sup.registry().has_process(&id));
    let stored = sup.db().get_job(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Paused);
    assert_eq!(statuses(&stored), vec![FileStatus::Completed, FileStatus::Pending]);

    assert_eq!(sup.run_job(&id).await.unwrap(), JobStatus::Completed);
    assert_eq!(engine.invocations(), vec!["urlA", "pause-urlB", "pause-urlB"]);
    assert!(root.path().join("02 - Title B.mp4").is_file());
}

#[tokio::test]
async fn resume_right_after_pause_continues_the_job() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup
        .create_job(batch(&["urlA", "pause-urlB"], &["Title A", "Title B"]))
        .await
        .unwrap();
    sup.resume_job(&id).await.unwrap();
    wait_for(&sup, &id, |j| j.files[1].status == FileStatus::Downloading).await;
    while !engine.seen("pause-urlB") {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // No waiting in between: the paused loop may still be unwinding.
    assert_eq!(sup.pause_job(&id).await.unwrap(), JobStatus::Paused);
    assert_eq!(sup.resume_job(&id).await.unwrap(), JobStatus::Downloading);

    let done = wait_for(&sup, &id, |j| j.status == JobStatus::Completed).await;
    assert_eq!(statuses(&done), vec![FileStatus::Completed, FileStatus::Completed]);
    assert_eq!(engine.invocations(), vec!["urlA", "pause-urlB", "pause-urlB"]);
    while sup.registry().is_supervised(&id) {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let stored = sup.db().get_job(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
}

#[tokio::test]
async fn failed_items_do_not_stop_the_batch() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup
        .create_job(batch(&["fail-a", "ok-b", "salvage-c"], &["A", "B", "C"]))
        .await
        .unwrap();
    assert_eq!(sup.run_job(&id).await.unwrap(), JobStatus::Error);

    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(
        statuses(&job),
        vec![FileStatus::Error, FileStatus::Completed, FileStatus::Completed]
    );
    assert_eq!(job.progress.completed, 2);
    // Salvaged output keeps the engine's container and the record follows it.
    assert_eq!(job.files[2].filename, "03 - C.mkv");
    assert!(root.path().join("03 - C.mkv").is_file());
    assert!(!root.path().join("01 - A.mp4").exists());

    // Resuming retries only what is not completed.
    assert_eq!(sup.run_job(&id).await.unwrap(), JobStatus::Error);
    assert_eq!(
        engine.invocations(),
        vec!["fail-a", "ok-b", "salvage-c", "fail-a"]
    );
}

#[tokio::test]
async fn resuming_twice_runs_one_loop() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup.create_job(batch(&["hold-a"], &["A"])).await.unwrap();
    let (first, second) = tokio::join!(sup.resume_job(&id), sup.resume_job(&id));
    assert_eq!(first.unwrap(), JobStatus::Downloading);
    assert_eq!(second.unwrap(), JobStatus::Downloading);

    wait_for(&sup, &id, |j| j.files[0].status == FileStatus::Downloading).await;
    assert_eq!(sup.resume_job(&id).await.unwrap(), JobStatus::Downloading);
    engine.release();

    let done = wait_for(&sup, &id, |j| j.status == JobStatus::Completed).await;
    assert_eq!(done.progress.completed, 1);
    assert_eq!(engine.invocations(), vec!["hold-a"]);
    // A completed job is not restarted.
    assert_eq!(sup.resume_job(&id).await.unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn delete_with_files_removes_only_job_outputs() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup
        .create_job(NewJob {
            folder: Some("set".into()),
            ..batch(&["urlA", "fail-b"], &["A", "B"])
        })
        .await
        .unwrap();
    sup.run_job(&id).await.unwrap();
    let dir = root.path().join("set");
    std::fs::write(dir.join("01 - A.webm"), b"leftover").unwrap();
    std::fs::write(dir.join("notes.txt"), b"mine").unwrap();
    std::fs::write(root.path().join("01 - A.mp4"), b"outside").unwrap();

    sup.delete_job(&id, true).await.unwrap();
    assert!(!dir.join("01 - A.mp4").exists());
    assert!(!dir.join("01 - A.webm").exists());
    assert!(dir.join("notes.txt").exists());
    assert!(root.path().join("01 - A.mp4").exists());
    assert!(sup.job_status(&id).await.unwrap_err().is_not_found());
    assert!(sup.list_jobs(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_pauses_a_running_job() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup.create_job(batch(&["pause-x"], &["X"])).await.unwrap();
    sup.resume_job(&id).await.unwrap();
    wait_for(&sup, &id, |j| j.files[0].status == FileStatus::Downloading).await;

    sup.delete_job(&id, false).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!sup.registry().has_process(&id));
    // The interrupted loop must not bring the row back.
    assert!(sup.db().get_job(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_with_files_clears_partial_staging() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let id = sup.create_job(batch(&["pause-x"], &["X"])).await.unwrap();
    sup.resume_job(&id).await.unwrap();
    wait_for(&sup, &id, |j| j.files[0].status == FileStatus::Downloading).await;
    while !engine.seen("pause-x") {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    sup.pause_job(&id).await.unwrap();
    while sup.registry().is_supervised(&id) {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let staging = root.path().join(".incomplete");
    assert!(staging.join("01 - X.mp4.part").is_file());
    std::fs::write(staging.join("Other.mp4.part"), b"someone else").unwrap();

    sup.delete_job(&id, true).await.unwrap();
    assert!(!staging.join("01 - X.mp4.part").exists());
    assert!(staging.join("Other.mp4.part").is_file());
    assert!(root.path().exists());
}

#[tokio::test]
async fn crash_recovery_makes_jobs_resumable() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let id = {
        let sup = supervisor(&engine, state.path(), root.path()).await;
        let id = sup.create_job(batch(&["urlA"], &["A"])).await.unwrap();
        let mut job = sup.job_status(&id).await.unwrap();
        job.status = JobStatus::Downloading;
        job.files[0].status = FileStatus::Downloading;
        sup.db().update_job(&job).await.unwrap();
        id
    };

    let sup = supervisor(&engine, state.path(), root.path()).await;
    assert_eq!(sup.recover_interrupted().await.unwrap(), 1);
    let job = sup.job_status(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Paused);
    assert_eq!(job.files[0].status, FileStatus::Pending);
    assert_eq!(sup.run_job(&id).await.unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn probe_and_update_use_the_engine() {
    let engine = FakeEngine::install();
    let state = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let sup = supervisor(&engine, state.path(), root.path()).await;

    let info = sup.video_info("https://example.com/list").await.unwrap();
    assert_eq!(info["title"], "Probe");
    assert_eq!(info["webpage_url"], "https://example.com/list");

    let out = sup.update_engine().await.unwrap();
    assert!(out.contains("up to date"));
}
