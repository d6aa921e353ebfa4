//! Errors returned by the supervisor's boundary operations.

use crate::engine::EngineError;

/// Boundary error. Match on `NotFound` to tell "no such job" apart from
/// failures that might succeed on retry.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl JobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound(_))
    }
}

pub type JobResult<T> = std::result::Result<T, JobError>;
