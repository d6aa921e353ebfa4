use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::{Backoff, RetryPolicy};

/// Directory name used under XDG config/state and under the user's downloads folder.
pub const APP_DIR: &str = "mediapull";

/// Folder created under the user's downloads directory when no root is configured.
pub const DEFAULT_ROOT_FOLDER: &str = "MediaPull";

/// Retry policy parameters for one retried operation (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on a single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// How the delay grows between attempts.
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff: self.backoff,
        }
    }
}

/// Retry settings for the two retried filesystem/process operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySection {
    /// Spawning the engine past transient lock/scan errors.
    #[serde(default)]
    pub spawn: Option<RetryConfig>,
    /// Moving a finished file out of staging.
    #[serde(default)]
    pub move_file: Option<RetryConfig>,
}

impl RetrySection {
    pub fn spawn_policy(&self) -> RetryPolicy {
        self.spawn
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_else(RetryPolicy::spawn_default)
    }

    pub fn move_policy(&self) -> RetryPolicy {
        self.move_file
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_else(RetryPolicy::move_default)
    }
}

fn default_ready_timeout_secs() -> u64 {
    30
}

fn default_parallelism() -> u32 {
    4
}

/// Engine binary locations and readiness timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit path to the extraction engine (overrides the bundled layout).
    #[serde(default)]
    pub extractor_path: Option<PathBuf>,
    /// Explicit path to the transcoding engine.
    #[serde(default)]
    pub transcoder_path: Option<PathBuf>,
    /// How long to wait for a freshly installed or scanned binary to become usable.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extractor_path: None,
            transcoder_path: None,
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

/// Global configuration loaded from `~/.config/mediapull/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPullConfig {
    /// Root folder for job output; defaults to `<downloads>/MediaPull`.
    #[serde(default)]
    pub download_root: Option<PathBuf>,
    /// Proxy URL handed to the engine verbatim.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Netscape cookie file handed to the engine; defaults to `cookies.txt` in the state dir.
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Ask the engine to embed metadata into the output.
    #[serde(default)]
    pub embed_metadata: bool,
    /// Ask the engine to embed a thumbnail (only for containers that support it).
    #[serde(default)]
    pub embed_thumbnail: bool,
    /// Fragment concurrency hint used when a job does not specify one.
    #[serde(default = "default_parallelism")]
    pub default_parallelism: u32,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for MediaPullConfig {
    fn default() -> Self {
        Self {
            download_root: None,
            proxy: None,
            cookie_file: None,
            embed_metadata: false,
            embed_thumbnail: false,
            default_parallelism: default_parallelism(),
            engine: EngineConfig::default(),
            retry: RetrySection::default(),
        }
    }
}

impl MediaPullConfig {
    /// Output root: configured value, else `<user downloads>/MediaPull`, else `~/MediaPull`.
    pub fn resolved_download_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.download_root {
            return Ok(root.clone());
        }
        dirs::download_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join(DEFAULT_ROOT_FOLDER))
            .context("cannot determine a downloads directory; set download_root in config.toml")
    }

    /// Cookie file to pass to the engine, if one exists on disk.
    pub fn resolved_cookie_file(&self) -> Option<PathBuf> {
        let path = match &self.cookie_file {
            Some(p) => p.clone(),
            None => default_cookie_path().ok()?,
        };
        path.is_file().then_some(path)
    }

    /// Proxy value with blank strings treated as unset.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.ready_timeout_secs)
    }
}

/// `~/.local/state/mediapull`, created if missing.
pub fn state_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR)?;
    let dir = xdg_dirs.get_state_home();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default cookie file location (`~/.local/state/mediapull/cookies.txt`).
pub fn default_cookie_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("cookies.txt"))
}

/// Unix socket a foreground runner listens on for `pause` requests.
pub fn control_socket_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("control.sock"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_DIR)?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediaPullConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MediaPullConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MediaPullConfig = toml::from_str(&data)?;
    Ok(cfg)
}
