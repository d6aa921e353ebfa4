//! Persistent job store (SQLite via sqlx).
//!
//! One row per batch job: settings, status, cached counts, and the ordered
//! item list. The store is the source of truth; in-memory copies live in
//! the registry only while referenced.

mod db;
mod jobs;
pub mod legacy;
pub mod types;

pub use db::{unix_millis, JobDb};
pub use types::*;

#[cfg(test)]
pub(crate) use db::open_memory;
