use serde::{Deserialize, Serialize};
use std::fmt;

/// Pull-request coordinates carried by a differential job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrContext {
    /// PR number on the hosting platform.
    pub number: u64,

    /// Target branch name (e.g. `main`).
    pub base_ref: String,

    /// Commit id of the PR head.
    pub head_sha: String,
}

/// One unit of orchestrator work, serialized as JSON on the queue.
///
/// A job with `pr` present is a differential scan (changed files only,
/// diffed against the stored baseline). A job without `pr` is a baseline
/// scan that rescans the whole tree and replaces the stored baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanJob {
    /// Repository owner on the hosting platform.
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Clone URL.
    pub repo_url: String,

    /// Default branch of the repository.
    pub default_branch: String,

    /// App installation used to mint the per-job access token.
    pub installation_id: u64,

    /// Present for differential (PR) jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrContext>,
}

impl ScanJob {
    pub fn mode(&self) -> ScanMode {
        if self.pr.is_some() {
            ScanMode::Pr
        } else {
            ScanMode::Baseline
        }
    }

    /// Key under which this repository's baseline is stored.
    pub fn baseline_key(&self) -> String {
        format!("{}:{}", self.owner, self.repo)
    }
}

/// Which kind of scan a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Pr,
    Baseline,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Pr => f.write_str("pr"),
            ScanMode::Baseline => f.write_str("baseline"),
        }
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Success => f.write_str("success"),
            JobStatus::Failed => f.write_str("failed"),
            JobStatus::Skipped => f.write_str("skipped"),
        }
    }
}

/// Structured record returned by the orchestrator for every job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub status: JobStatus,
    pub new_issues_found: usize,
    pub mode: ScanMode,
}
