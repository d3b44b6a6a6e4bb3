//! Redis-backed collaborators: the job queue the intake feeds and the
//! per-repository baseline store the orchestrator diffs against.
//!
//! Both speak to the same broker (`REDIS_URL`). The baseline store is the
//! only state shared across jobs; writes replace the whole set, so
//! concurrent baseline scans are last-writer-wins by design.

pub mod baseline;
pub mod queue;

pub use baseline::BaselineStore;
pub use queue::JobQueue;

use thiserror::Error;

/// Baseline-store / queue transport errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("malformed queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
