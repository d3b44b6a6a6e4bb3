use crate::models::{PullRequestEvent, PushEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use pitcrew_core::{PrContext, ScanJob};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// PR actions that trigger a differential scan.
const SCAN_ACTIONS: [&str; 3] = ["opened", "synchronize", "reopened"];

/// Where authenticated webhook events are handed off to.
///
/// Implemented by the queue in the service binary; test doubles capture
/// the enqueued jobs instead.
#[async_trait::async_trait]
pub trait JobSink: Send + Sync {
    async fn enqueue(&self, job: ScanJob) -> anyhow::Result<()>;
}

/// Shared state of the webhook endpoint.
pub struct WebhookState {
    secret: String,
    sink: Arc<dyn JobSink>,
}

impl WebhookState {
    pub fn new(secret: impl Into<String>, sink: Arc<dyn JobSink>) -> Self {
        Self {
            secret: secret.into(),
            sink,
        }
    }
}

/// Build the webhook router. Binding the listener is left to the caller.
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook/github", post(handle_webhook))
        .with_state(state)
}

/// Verify a GitHub webhook signature (HMAC-SHA256 over the raw body).
fn verify_signature(secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    let signature = match signature_header {
        Some(sig) => sig,
        None => {
            warn!("missing X-Hub-Signature-256 header");
            return false;
        }
    };

    // GitHub sends the signature as "sha256=<hex>"
    let expected = match signature.strip_prefix("sha256=") {
        Some(sig) => sig,
        None => {
            warn!("malformed signature header");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("failed to create HMAC: {e}");
            return false;
        }
    };
    mac.update(body);
    let computed_hex = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks
    if computed_hex.len() != expected.len() {
        return false;
    }
    computed_hex
        .bytes()
        .zip(expected.bytes())
        .fold(0, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// The one HTTP endpoint of the gateway.
///
/// The raw body bytes are read before any JSON parse so the signature is
/// verified over exactly the bytes GitHub signed.
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());

    if !verify_signature(&state.secret, signature, &body) {
        warn!("rejecting webhook with invalid signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let event = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match event {
        "ping" => (StatusCode::OK, "pong").into_response(),
        "pull_request" => handle_pull_request(&state, &body).await,
        "push" => handle_push(&state, &body).await,
        other => {
            info!(event = other, "ignoring event");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn handle_pull_request(state: &WebhookState, body: &[u8]) -> Response {
    let event: PullRequestEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            error!("unparseable pull_request payload: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if !SCAN_ACTIONS.contains(&event.action.as_str()) {
        info!(action = %event.action, number = event.number, "ignoring PR action");
        return StatusCode::NO_CONTENT.into_response();
    }

    let repo = &event.repository;
    let job = ScanJob {
        owner: repo.owner.login.clone(),
        repo: repo.name.clone(),
        repo_url: repo.clone_url.clone(),
        default_branch: repo.default_branch.clone(),
        installation_id: event.installation.id,
        pr: Some(PrContext {
            number: event.number,
            base_ref: event.pull_request.base.branch_ref.clone(),
            head_sha: event.pull_request.head.sha.clone(),
        }),
    };

    info!(repo = %repo.full_name, pr = event.number, action = %event.action, "enqueueing differential scan");
    enqueue(state, job).await
}

async fn handle_push(state: &WebhookState, body: &[u8]) -> Response {
    let event: PushEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            error!("unparseable push payload: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let repo = &event.repository;
    let default_ref = format!("refs/heads/{}", repo.default_branch);
    if event.push_ref != default_ref {
        info!(push_ref = %event.push_ref, "ignoring push to non-default ref");
        return StatusCode::NO_CONTENT.into_response();
    }

    // A push to the default branch re-establishes the repository baseline.
    let job = ScanJob {
        owner: repo.owner.login.clone(),
        repo: repo.name.clone(),
        repo_url: repo.clone_url.clone(),
        default_branch: repo.default_branch.clone(),
        installation_id: event.installation.id,
        pr: None,
    };

    info!(repo = %repo.full_name, "enqueueing baseline scan");
    enqueue(state, job).await
}

async fn enqueue(state: &WebhookState, job: ScanJob) -> Response {
    match state.sink.enqueue(job).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            error!("failed to enqueue job: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    struct CapturingSink {
        jobs: Mutex<Vec<ScanJob>>,
    }

    #[async_trait::async_trait]
    impl JobSink for CapturingSink {
        async fn enqueue(&self, job: ScanJob) -> anyhow::Result<()> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn setup() -> (Router, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink {
            jobs: Mutex::new(Vec::new()),
        });
        let state = Arc::new(WebhookState::new("topsecret", sink.clone()));
        (webhook_router(state), sink)
    }

    fn request(event: &str, signature: Option<String>, body: &[u8]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook/github")
            .header("Content-Type", "application/json")
            .header("X-GitHub-Event", event);
        if let Some(sig) = signature {
            builder = builder.header("X-Hub-Signature-256", sig);
        }
        builder.body(Body::from(body.to_vec())).unwrap()
    }

    fn pr_payload(action: &str) -> Vec<u8> {
        serde_json::json!({
            "action": action,
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
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn signature_round_trip() {
        let body = b"payload bytes";
        let sig = sign("key", body);
        assert!(verify_signature("key", Some(&sig), body));
    }

    #[test]
    fn signature_rejects_tampered_body() {
        let sig = sign("key", b"original");
        assert!(!verify_signature("key", Some(&sig), b"tampered"));
    }

    #[test]
    fn signature_rejects_wrong_key() {
        let sig = sign("other-key", b"body");
        assert!(!verify_signature("key", Some(&sig), b"body"));
    }

    #[test]
    fn signature_rejects_missing_or_malformed_header() {
        assert!(!verify_signature("key", None, b"body"));
        assert!(!verify_signature("key", Some("md5=abc"), b"body"));
        assert!(!verify_signature("key", Some("sha256=zz"), b"body"));
    }

    #[tokio::test]
    async fn invalid_signature_is_401_and_not_enqueued() {
        let (router, sink) = setup();
        let body = pr_payload("opened");
        let sig = sign("wrong-secret", &body);
        let response = router
            .oneshot(request("pull_request", Some(sig), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ping_is_200() {
        let (router, _) = setup();
        let body = br#"{"zen":"Keep it logically awesome."}"#;
        let sig = sign("topsecret", body);
        let response = router
            .oneshot(request("ping", Some(sig), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pr_opened_enqueues_differential_job() {
        let (router, sink) = setup();
        let body = pr_payload("opened");
        let sig = sign("topsecret", &body);
        let response = router
            .oneshot(request("pull_request", Some(sig), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let jobs = sink.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.owner, "acme");
        assert_eq!(job.repo, "vault");
        assert_eq!(job.installation_id, 42);
        let pr = job.pr.as_ref().unwrap();
        assert_eq!(pr.number, 7);
        assert_eq!(pr.base_ref, "main");
        assert_eq!(pr.head_sha, "abc123");
    }

    #[tokio::test]
    async fn pr_closed_is_204() {
        let (router, sink) = setup();
        let body = pr_payload("closed");
        let sig = sign("topsecret", &body);
        let response = router
            .oneshot(request("pull_request", Some(sig), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_to_default_branch_enqueues_baseline_job() {
        let (router, sink) = setup();
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "repository": {
                "name": "vault",
                "full_name": "acme/vault",
                "owner": {"login": "acme"},
                "default_branch": "main",
                "clone_url": "https://github.com/acme/vault.git"
            },
            "installation": {"id": 42}
        })
        .to_string()
        .into_bytes();
        let sig = sign("topsecret", &body);
        let response = router
            .oneshot(request("push", Some(sig), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let jobs = sink.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].pr.is_none());
    }

    #[tokio::test]
    async fn push_to_feature_branch_is_204() {
        let (router, sink) = setup();
        let body = serde_json::json!({
            "ref": "refs/heads/feature",
            "repository": {
                "name": "vault",
                "full_name": "acme/vault",
                "owner": {"login": "acme"},
                "default_branch": "main",
                "clone_url": "https://github.com/acme/vault.git"
            },
            "installation": {"id": 42}
        })
        .to_string()
        .into_bytes();
        let sig = sign("topsecret", &body);
        let response = router
            .oneshot(request("push", Some(sig), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(sink.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_event_is_204() {
        let (router, _) = setup();
        let body = b"{}";
        let sig = sign("topsecret", body);
        let response = router
            .oneshot(request("workflow_run", Some(sig), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unparseable_pull_request_is_400() {
        let (router, _) = setup();
        let body = br#"{"action": "opened"}"#;
        let sig = sign("topsecret", body);
        let response = router
            .oneshot(request("pull_request", Some(sig), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
