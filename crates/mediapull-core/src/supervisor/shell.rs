//! Side-effect operations with no job state change: folders, cookies, engine queries.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::Supervisor;
use crate::error::{JobError, JobResult};

#[cfg(target_os = "windows")]
const FILE_MANAGER: &str = "explorer";
#[cfg(target_os = "macos")]
const FILE_MANAGER: &str = "open";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const FILE_MANAGER: &str = "xdg-open";

/// Hand `path` to the desktop's file manager without waiting for it.
fn open_in_file_manager(path: &Path) -> io::Result<()> {
    Command::new(FILE_MANAGER)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

impl Supervisor {
    /// Open the job's destination directory. Returns the path opened.
    pub async fn open_job_folder(&self, id: &str) -> JobResult<PathBuf> {
        let job = self.job_status(id).await?;
        let dir = job.destination_dir;
        if !dir.is_dir() {
            return Err(JobError::InvalidRequest(format!(
                "folder does not exist: {}",
                dir.display()
            )));
        }
        open_in_file_manager(&dir).map_err(|e| anyhow::anyhow!("{FILE_MANAGER}: {e}"))?;
        Ok(dir)
    }

    /// Open the download root, creating it first if needed.
    pub async fn open_root_folder(&self) -> JobResult<PathBuf> {
        let root = self.settings.download_root.clone();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", root.display()))?;
        open_in_file_manager(&root).map_err(|e| anyhow::anyhow!("{FILE_MANAGER}: {e}"))?;
        Ok(root)
    }

    /// Store Netscape-format cookies for future engine runs. Blank content
    /// removes the cookie file.
    pub async fn save_cookies(&self, content: &str) -> JobResult<()> {
        let path = &self.settings.cookie_file;
        if content.trim().is_empty() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::info!(path = %path.display(), "cookies cleared"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(anyhow::anyhow!("cannot remove {}: {e}", path.display()).into()),
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "cookies saved");
        Ok(())
    }

    /// Engine metadata for `url` with the configured proxy and cookies.
    pub async fn video_info(&self, url: &str) -> JobResult<serde_json::Value> {
        let url = url.trim();
        if url.is_empty() {
            return Err(JobError::InvalidRequest("no URL given".into()));
        }
        Ok(self
            .launcher
            .probe(url, self.settings.proxy.as_deref(), self.settings.cookies())
            .await?)
    }

    pub async fn update_engine(&self) -> JobResult<String> {
        Ok(self.launcher.update_engine().await?)
    }
}
