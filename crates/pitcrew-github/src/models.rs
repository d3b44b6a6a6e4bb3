use serde::{Deserialize, Serialize};

/// Check run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

/// Terminal conclusion of a completed check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    ActionRequired,
}

/// Check run creation request
#[derive(Debug, Clone, Serialize)]
pub struct CreateCheckRunRequest {
    /// Check name shown on the PR
    pub name: String,

    /// Commit the check is attached to
    pub head_sha: String,

    /// Initial status
    pub status: CheckStatus,
}

/// Check run update request
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckRunUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<CheckConclusion>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput>,
}

/// Human-visible output block of a check run
#[derive(Debug, Clone, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
}

/// Check run as returned by the API (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub id: u64,
}

/// Issue comment creation request
#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

/// Installation access token response
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub token: String,
    pub expires_at: String,
}

// --- webhook payloads -------------------------------------------------

/// Pull request event payload (only the fields the gateway reads)
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestPayload,
    pub repository: Repository,
    pub installation: Installation,
}

/// Nested pull request object
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub head: BranchRef,
    pub base: BranchRef,
}

/// Branch reference inside a PR payload
#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    /// Branch name
    #[serde(rename = "ref")]
    pub branch_ref: String,

    /// Commit id
    pub sha: String,
}

/// Push event payload
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// Full ref that was pushed, e.g. `refs/heads/main`
    #[serde(rename = "ref")]
    pub push_ref: String,
    pub repository: Repository,
    pub installation: Installation,
}

/// Repository coordinates
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: User,
    pub default_branch: String,
    pub clone_url: String,
}

/// Repository owner
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

/// App installation reference
#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CheckStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&CheckConclusion::ActionRequired).unwrap(),
            "\"action_required\""
        );
    }

    #[test]
    fn update_skips_unset_fields() {
        let update = CheckRunUpdate {
            status: Some(CheckStatus::Completed),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"status": "completed"}));
    }

    #[test]
    fn parses_pull_request_event() {
        let payload = serde_json::json!({
            "action": "opened",
            "number": 7,
            "pull_request": {
                "head": {"ref": "feature", "sha": "abc123"},
                "base": {"ref": "main", "sha": "def456"}
            },
            "repository": {
                "name": "vault",
                "full_name": "acme/vault",
                "owner": {"login": "acme"},
                "default_branch": "main",
                "clone_url": "https://github.com/acme/vault.git"
            },
            "installation": {"id": 42}
        });
        let event: PullRequestEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.number, 7);
        assert_eq!(event.pull_request.base.branch_ref, "main");
        assert_eq!(event.repository.owner.login, "acme");
        assert_eq!(event.installation.id, 42);
    }
}
