pub mod config;
pub mod logging;

pub mod engine;
pub mod error;
pub mod job_db;
pub mod naming;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod staging;
pub mod supervisor;

pub use error::{JobError, JobResult};
pub use supervisor::{NewJob, Supervisor, SupervisorSettings};
