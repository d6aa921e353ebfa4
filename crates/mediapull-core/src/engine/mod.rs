//! External extraction/transcoding engine: location, readiness, spawning.
//!
//! The engine is an opaque executable. This module finds it, waits out
//! transient locks from installers and virus scanners, spawns it with a retry
//! policy, and builds the argument list for one item. Launch-health events are
//! pushed to the progress hub as advisory telemetry only.

mod args;
mod health;
mod launcher;
mod locate;
mod probe;
mod progress_line;

pub use args::{
    default_container, is_audio_format, supports_thumbnail, Invocation, THUMBNAIL_CONTAINERS,
};
pub use health::{LaunchHealth, LaunchState};
pub use launcher::EngineLauncher;
pub use locate::{bundled_bin_dir, resolve, EngineKind};
pub use probe::explain_failure;
pub use progress_line::{parse_progress_line, ProgressLine};

use std::time::Duration;

/// Errors raised while locating, preparing, or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The binary path could not be determined (configuration error, never retried).
    #[error("cannot locate {binary}: {reason}")]
    Unresolvable { binary: String, reason: String },
    /// The binary did not become usable before the readiness timeout.
    #[error("{binary} was not ready after {waited:?} (still missing or locked)")]
    NotReady { binary: String, waited: Duration },
    /// Spawning failed; transient failures were retried `attempts` times.
    #[error("failed to start {binary} after {attempts} attempt(s): {source}")]
    SpawnFailed {
        binary: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
    /// A one-shot engine command (probe, self-update) exited unsuccessfully.
    #[error("{binary} exited with code {code:?}: {message}")]
    Failed {
        binary: String,
        code: Option<i32>,
        message: String,
    },
    #[error("could not parse engine output: {0}")]
    BadOutput(String),
    #[error("engine i/o: {0}")]
    Io(#[from] std::io::Error),
}
