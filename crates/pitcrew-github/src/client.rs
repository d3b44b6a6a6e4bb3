use crate::auth::{AppAuth, InstallationToken};
use crate::error::{GitHubError, Result};
use crate::models::*;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("pitcrew/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client for the three operations the gateway performs:
/// minting installation tokens, posting issue comments, and managing
/// check runs. Transient network failures are retried by middleware;
/// calls are throttled by a conservative shared rate limiter.
pub struct GitHubClient {
    /// HTTP client with retry middleware
    client: ClientWithMiddleware,

    /// Rate limiter shared across all calls from this client
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    /// API root; overridable for tests
    base_url: String,
}

impl GitHubClient {
    /// Create a client against api.github.com.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against an alternate API root (tests, GHES).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // Retry policy: 3 retries with exponential backoff
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        // 60 requests/minute is well under the installation-token limit
        // and keeps a burst of concurrent jobs from tripping abuse detection.
        let quota = Quota::per_minute(NonZeroU32::new(60).expect("nonzero"));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client,
            rate_limiter,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {bearer}"))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", USER_AGENT)
    }

    /// Exchange an app JWT for a short-lived installation access token.
    pub async fn issue_installation_token(
        &self,
        auth: &AppAuth,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.base_url, installation_id
        );
        let jwt = auth.app_jwt()?;

        debug!(installation_id, "minting installation token");

        let response = self.headers(self.client.post(&url), &jwt).send().await?;

        match response.status() {
            StatusCode::CREATED => {
                let body: AccessTokenResponse = response.json().await?;
                info!(installation_id, expires_at = %body.expires_at, "installation token minted");
                Ok(InstallationToken::new(body.token, body.expires_at))
            }
            StatusCode::UNAUTHORIZED => {
                warn!(installation_id, "unauthorized minting installation token");
                Err(GitHubError::Unauthorized)
            }
            StatusCode::NOT_FOUND => {
                warn!(installation_id, "installation not found");
                Err(GitHubError::NotFound(format!(
                    "installation {installation_id}"
                )))
            }
            status => {
                let error_body = response.text().await?;
                warn!(%status, "unexpected status minting installation token");
                Err(GitHubError::UnexpectedStatus(status.as_u16(), error_body))
            }
        }
    }

    /// Post a comment on a pull request (PRs are issues to the comments API).
    pub async fn post_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
        token: &InstallationToken,
    ) -> Result<()> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, owner, repo, pr_number
        );

        debug!(owner, repo, pr_number, "posting PR comment");

        let request = CreateCommentRequest {
            body: body.to_string(),
        };
        let response = self
            .headers(self.client.post(&url), token.secret())
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(owner, repo, pr_number, "posted PR comment");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(GitHubError::Unauthorized),
            StatusCode::FORBIDDEN => Err(GitHubError::Forbidden),
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound(format!(
                "{owner}/{repo}#{pr_number}"
            ))),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let error_body = response.text().await?;
                warn!(owner, repo, pr_number, "validation error posting comment");
                Err(GitHubError::BadRequest(error_body))
            }
            status => {
                let error_body = response.text().await?;
                warn!(%status, "unexpected status posting comment");
                Err(GitHubError::UnexpectedStatus(status.as_u16(), error_body))
            }
        }
    }

    /// Create a check run attached to a commit; returns the check run id.
    pub async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        head_sha: &str,
        name: &str,
        status: CheckStatus,
        token: &InstallationToken,
    ) -> Result<u64> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/repos/{}/{}/check-runs", self.base_url, owner, repo);

        debug!(owner, repo, head_sha, "creating check run");

        let request = CreateCheckRunRequest {
            name: name.to_string(),
            head_sha: head_sha.to_string(),
            status,
        };
        let response = self
            .headers(self.client.post(&url), token.secret())
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let check: CheckRun = response.json().await?;
                info!(owner, repo, check_run_id = check.id, "created check run");
                Ok(check.id)
            }
            StatusCode::UNAUTHORIZED => Err(GitHubError::Unauthorized),
            StatusCode::FORBIDDEN => Err(GitHubError::Forbidden),
            StatusCode::NOT_FOUND => {
                Err(GitHubError::NotFound(format!("{owner}/{repo}@{head_sha}")))
            }
            status => {
                let error_body = response.text().await?;
                warn!(%status, "unexpected status creating check run");
                Err(GitHubError::UnexpectedStatus(status.as_u16(), error_body))
            }
        }
    }

    /// Update an existing check run (status, conclusion, output).
    pub async fn update_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        update: CheckRunUpdate,
        token: &InstallationToken,
    ) -> Result<()> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/repos/{}/{}/check-runs/{}",
            self.base_url, owner, repo, check_run_id
        );

        debug!(owner, repo, check_run_id, "updating check run");

        let response = self
            .headers(self.client.patch(&url), token.secret())
            .json(&update)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                info!(owner, repo, check_run_id, "updated check run");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(GitHubError::Unauthorized),
            StatusCode::NOT_FOUND => {
                Err(GitHubError::NotFound(format!("check run {check_run_id}")))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                let error_body = response.text().await?;
                Err(GitHubError::BadRequest(error_body))
            }
            status => {
                let error_body = response.text().await?;
                warn!(%status, "unexpected status updating check run");
                Err(GitHubError::UnexpectedStatus(status.as_u16(), error_body))
            }
        }
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}
