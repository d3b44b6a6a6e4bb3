//! pit crew — a continuous-integration security gateway for Solidity
//! repositories.
//!
//! A pull-request webhook enqueues a job; a worker clones the repository,
//! runs the enabled analyzers over the changed contracts, diffs the
//! findings against the repository's stored baseline, and reports only
//! the new issues back onto the PR as a comment plus a gating check run.
//! Pushes to the default branch rebuild the baseline.

pub mod adapters;
pub mod exec;
pub mod git;
pub mod hosting;
pub mod orchestrator;
pub mod reporter;
pub mod scanner;
pub mod server;
pub mod settings;
pub mod worker;

pub use orchestrator::Orchestrator;
pub use scanner::UnifiedScanner;
pub use settings::Settings;
