//! The scan orchestrator: one durable task per queue job.
//!
//! Seven strictly ordered steps — workspace, authenticate + clone, load
//! config, discover files, scan, report, cleanup. Cleanup runs on every
//! exit path (success, failure, panic, cancellation) via a drop guard.
//! Transient git failures are retried with exponential delay; auth,
//! scanner, and store failures are deterministic and are not.

use crate::git::{self, GitError};
use crate::hosting::HostingApi;
use crate::reporter::{check_summary, gate_conclusion, Reporter};
use crate::scanner::{ScannerError, UnifiedScanner};
use pitcrew_core::{Finding, JobStatus, PrContext, ScanConfig, ScanJob, ScanMode, ScanOutcome};
use pitcrew_github::{CheckConclusion, GitHubError};
use pitcrew_store::{BaselineStore, StoreError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Additional attempts after the first failure.
const MAX_RETRIES: u32 = 2;

/// First retry delay; doubles per attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(10);

/// The scan capability, seamed so orchestrator tests can inject
/// deterministic findings.
#[async_trait::async_trait]
pub trait ScanEngine: Send + Sync {
    async fn scan(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<Vec<Finding>, ScannerError>;
}

/// Production engine: builds the adapter set from the repo manifest.
pub struct AdapterScanEngine;

#[async_trait::async_trait]
impl ScanEngine for AdapterScanEngine {
    async fn scan(
        &self,
        repo_root: &Path,
        files: Option<&[String]>,
        config: &ScanConfig,
    ) -> Result<Vec<Finding>, ScannerError> {
        UnifiedScanner::from_config(config)
            .run(repo_root, files, config)
            .await
    }
}

/// The baseline capability consumed by differential and baseline scans.
#[async_trait::async_trait]
pub trait BaselineRepo: Send + Sync {
    async fn read(&self, owner: &str, repo: &str) -> Result<HashSet<String>, StoreError>;
    async fn write(
        &self,
        owner: &str,
        repo: &str,
        fingerprints: &HashSet<String>,
    ) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl BaselineRepo for BaselineStore {
    async fn read(&self, owner: &str, repo: &str) -> Result<HashSet<String>, StoreError> {
        BaselineStore::read(self, owner, repo).await
    }

    async fn write(
        &self,
        owner: &str,
        repo: &str,
        fingerprints: &HashSet<String>,
    ) -> Result<(), StoreError> {
        BaselineStore::write(self, owner, repo, fingerprints).await
    }
}

#[derive(Debug, Error)]
enum JobError {
    #[error("workspace setup failed: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("authentication failed: {0}")]
    Auth(#[source] GitHubError),

    #[error(transparent)]
    Git(GitError),

    #[error(transparent)]
    Scanner(ScannerError),

    #[error("baseline store failure: {0}")]
    Store(#[source] StoreError),
}

impl JobError {
    fn is_transient(&self) -> bool {
        matches!(self, JobError::Git(err) if err.is_transient())
    }
}

/// Deletes the workspace when the job ends, however it ends.
struct WorkspaceGuard {
    path: PathBuf,
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        git::remove_workspace(&self.path);
    }
}

/// Executes scan jobs against the hosting platform and baseline store.
pub struct Orchestrator<H, B, S> {
    hosting: H,
    baselines: B,
    engine: S,
    retry_base_delay: Duration,
}

impl<H: HostingApi, B: BaselineRepo, S: ScanEngine> Orchestrator<H, B, S> {
    pub fn new(hosting: H, baselines: B, engine: S) -> Self {
        Self {
            hosting,
            baselines,
            engine,
            retry_base_delay: RETRY_BASE_DELAY,
        }
    }

    /// Run a job to completion, retrying transient failures.
    pub async fn run(&self, job: &ScanJob) -> ScanOutcome {
        let mode = job.mode();
        let mut attempt = 0u32;
        loop {
            match self.run_once(job).await {
                Ok(outcome) => return outcome,
                Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                    warn!(%err, attempt, delay_secs = delay.as_secs_f64(), "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    error!(%err, owner = %job.owner, repo = %job.repo, "job failed");
                    return ScanOutcome {
                        status: JobStatus::Failed,
                        new_issues_found: 0,
                        mode,
                    };
                }
            }
        }
    }

    async fn run_once(&self, job: &ScanJob) -> Result<ScanOutcome, JobError> {
        // Step 1: workspace. Fatal on failure.
        let workspace = git::create_workspace().map_err(|err| match err {
            GitError::Workspace(io) => JobError::Workspace(io),
            other => JobError::Git(other),
        })?;
        // Step 7 is armed before anything else can fail.
        let _cleanup = WorkspaceGuard {
            path: workspace.clone(),
        };

        // Step 2: authenticate and clone. Tokens are per-job, never cached.
        let token = self
            .hosting
            .issue_installation_token(job.installation_id)
            .await
            .map_err(JobError::Auth)?;
        let shallow = job.mode() == ScanMode::Baseline;
        git::clone_repo(&workspace, &job.repo_url, Some(token.secret()), shallow)
            .await
            .map_err(JobError::Git)?;
        let repo_root = git::repo_root(&workspace).map_err(JobError::Git)?;

        if let Some(pr) = &job.pr {
            git::fetch_base_ref(&repo_root, &pr.base_ref).await;
            git::checkout(&repo_root, &pr.head_sha)
                .await
                .map_err(JobError::Git)?;
        }

        // Step 3: load config. Degrades to defaults, never fails the job.
        let config = ScanConfig::load(&repo_root);

        match &job.pr {
            Some(pr) => {
                self.run_differential(job, pr, &repo_root, &config, &token)
                    .await
            }
            None => self.run_baseline(job, &repo_root, &config).await,
        }
    }

    async fn run_differential(
        &self,
        job: &ScanJob,
        pr: &PrContext,
        repo_root: &Path,
        config: &ScanConfig,
        token: &pitcrew_github::InstallationToken,
    ) -> Result<ScanOutcome, JobError> {
        let reporter = Reporter::new(&self.hosting, token, &job.owner, &job.repo, pr);

        // Step 4: discover changed files.
        let files = git::changed_solidity_files(repo_root, &pr.base_ref, config)
            .await
            .map_err(JobError::Git)?;

        let check_id = reporter.start_check().await;

        if files.is_empty() {
            info!(owner = %job.owner, repo = %job.repo, pr = pr.number, "no Solidity changes, skipping scan");
            reporter
                .complete_check(check_id, CheckConclusion::Success, "No Solidity changes.")
                .await;
            return Ok(ScanOutcome {
                status: JobStatus::Success,
                new_issues_found: 0,
                mode: ScanMode::Pr,
            });
        }

        // Step 5: scan. A scanner-fatal error is reported on the PR and
        // re-raised without retry.
        let findings = match self.engine.scan(repo_root, Some(&files), config).await {
            Ok(findings) => findings,
            Err(err) => {
                reporter
                    .post_error_report("The security scanner failed before producing results.")
                    .await;
                reporter
                    .complete_check(check_id, CheckConclusion::Failure, "Security scan failed.")
                    .await;
                return Err(JobError::Scanner(err));
            }
        };

        // Step 6: diff against the baseline and publish. A baseline read
        // failure degrades to the empty set: over-reporting beats
        // silently under-reporting.
        let baseline = match self.baselines.read(&job.owner, &job.repo).await {
            Ok(baseline) => baseline,
            Err(err) => {
                warn!(%err, "baseline read failed, treating baseline as empty");
                HashSet::new()
            }
        };
        let new_findings: Vec<Finding> = findings
            .into_iter()
            .filter(|f| !baseline.contains(&f.fingerprint()))
            .collect();

        reporter.post_report(&new_findings).await;
        let conclusion = gate_conclusion(&new_findings, config.block_on_severity);
        reporter
            .complete_check(check_id, conclusion, &check_summary(&new_findings))
            .await;

        info!(
            owner = %job.owner,
            repo = %job.repo,
            pr = pr.number,
            new_issues = new_findings.len(),
            "differential scan complete"
        );
        Ok(ScanOutcome {
            status: JobStatus::Success,
            new_issues_found: new_findings.len(),
            mode: ScanMode::Pr,
        })
    }

    async fn run_baseline(
        &self,
        job: &ScanJob,
        repo_root: &Path,
        config: &ScanConfig,
    ) -> Result<ScanOutcome, JobError> {
        // Steps 4-5: no diff in baseline mode; scanners walk the tree.
        let findings = self
            .engine
            .scan(repo_root, None, config)
            .await
            .map_err(JobError::Scanner)?;

        // Step 6: replace the stored baseline. No reporter calls without
        // a PR. Store failures are a job failure here, unlike reads.
        let fingerprints: HashSet<String> = findings.iter().map(Finding::fingerprint).collect();
        self.baselines
            .write(&job.owner, &job.repo, &fingerprints)
            .await
            .map_err(JobError::Store)?;

        info!(
            owner = %job.owner,
            repo = %job.repo,
            fingerprints = fingerprints.len(),
            "baseline scan complete"
        );
        Ok(ScanOutcome {
            status: JobStatus::Success,
            new_issues_found: 0,
            mode: ScanMode::Baseline,
        })
    }
}
