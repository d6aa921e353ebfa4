//! Platform- and build-mode-dependent engine binary locations.

use std::path::{Path, PathBuf};

use super::EngineError;

/// Which engine binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Media extraction/download engine (yt-dlp).
    Extractor,
    /// Transcoding engine (ffmpeg), used by the extractor for merges and conversions.
    Transcoder,
}

impl EngineKind {
    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Extractor => "yt-dlp",
            EngineKind::Transcoder => "ffmpeg",
        }
    }

    /// File name of the binary on the current OS.
    pub fn binary_name(self) -> &'static str {
        match self {
            EngineKind::Extractor => {
                if cfg!(windows) {
                    "yt-dlp.exe"
                } else if cfg!(target_os = "macos") {
                    "yt-dlp_macos"
                } else {
                    "yt-dlp"
                }
            }
            EngineKind::Transcoder => {
                if cfg!(windows) {
                    "ffmpeg.exe"
                } else {
                    "ffmpeg"
                }
            }
        }
    }
}

/// Directory holding bundled engine binaries.
///
/// Release (packaged) builds look next to the executable; debug (development)
/// builds look in `./bin` under the working directory.
pub fn bundled_bin_dir() -> Result<PathBuf, EngineError> {
    let base = if cfg!(debug_assertions) {
        std::env::current_dir().map_err(|e| EngineError::Unresolvable {
            binary: "bin directory".to_string(),
            reason: format!("no working directory: {e}"),
        })?
    } else {
        let exe = std::env::current_exe().map_err(|e| EngineError::Unresolvable {
            binary: "bin directory".to_string(),
            reason: format!("no executable path: {e}"),
        })?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| EngineError::Unresolvable {
                binary: "bin directory".to_string(),
                reason: format!("executable has no parent: {}", exe.display()),
            })?
    };
    Ok(base.join("bin"))
}

/// Resolve the path of `kind`: an explicit override wins, otherwise the bundled layout.
pub fn resolve(kind: EngineKind, override_path: Option<&Path>) -> Result<PathBuf, EngineError> {
    if let Some(p) = override_path {
        if p.as_os_str().is_empty() {
            return Err(EngineError::Unresolvable {
                binary: kind.label().to_string(),
                reason: "configured path is empty".to_string(),
            });
        }
        return Ok(p.to_path_buf());
    }
    Ok(bundled_bin_dir()?.join(kind.binary_name()))
}
