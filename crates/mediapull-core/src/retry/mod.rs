//! Retry and backoff policy.
//!
//! A retry policy is a plain value (attempt budget plus backoff schedule) that
//! is handed to a generic async retry loop. Engine spawning and moving finished
//! files out of staging both go through the same primitive.

mod classify;
mod policy;
mod run;

pub use classify::classify_io_error;
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
