//! The hosting-platform capability the orchestrator consumes.
//!
//! The trait mirrors exactly the four platform operations the pipeline
//! needs; production wires it to the GitHub App client, tests substitute
//! a recording double.

use pitcrew_github::{
    AppAuth, CheckRunUpdate, CheckStatus, GitHubClient, GitHubError, InstallationToken,
};

#[async_trait::async_trait]
pub trait HostingApi: Send + Sync {
    /// Mint a short-lived access token for one installation.
    async fn issue_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken, GitHubError>;

    /// Publish a comment on a pull request.
    async fn post_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
        token: &InstallationToken,
    ) -> Result<(), GitHubError>;

    /// Create a check run on a commit; returns its id.
    async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        head_sha: &str,
        name: &str,
        status: CheckStatus,
        token: &InstallationToken,
    ) -> Result<u64, GitHubError>;

    /// Update a check run's status, conclusion, or output.
    async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        update: CheckRunUpdate,
        token: &InstallationToken,
    ) -> Result<(), GitHubError>;
}

/// Production implementation backed by the GitHub App client.
pub struct GitHubHosting {
    client: GitHubClient,
    auth: AppAuth,
}

impl GitHubHosting {
    pub fn new(client: GitHubClient, auth: AppAuth) -> Self {
        Self { client, auth }
    }
}

#[async_trait::async_trait]
impl HostingApi for GitHubHosting {
    async fn issue_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken, GitHubError> {
        self.client
            .issue_installation_token(&self.auth, installation_id)
            .await
    }

    async fn post_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
        token: &InstallationToken,
    ) -> Result<(), GitHubError> {
        self.client
            .post_issue_comment(owner, repo, pr_number, body, token)
            .await
    }

    async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        head_sha: &str,
        name: &str,
        status: CheckStatus,
        token: &InstallationToken,
    ) -> Result<u64, GitHubError> {
        self.client
            .create_check_run(owner, repo, head_sha, name, status, token)
            .await
    }

    async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        update: CheckRunUpdate,
        token: &InstallationToken,
    ) -> Result<(), GitHubError> {
        self.client
            .update_check_run(owner, repo, check_run_id, update, token)
            .await
    }
}
