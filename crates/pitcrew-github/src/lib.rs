//! GitHub App integration for the pit crew gateway.
//!
//! This crate owns everything that talks to the hosting platform:
//!
//! - App authentication: a short-lived RS256 app JWT exchanged for a
//!   per-installation access token (≤ 1 h)
//! - REST client for issue comments and check runs, with retry
//!   middleware and a conservative rate limiter
//! - The webhook endpoint: HMAC-SHA256 signature verification over the
//!   raw body, then event dispatch into the job queue

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod webhook;

pub use auth::{AppAuth, InstallationToken};
pub use client::GitHubClient;
pub use error::GitHubError;
pub use models::{CheckConclusion, CheckRunOutput, CheckRunUpdate, CheckStatus};
pub use webhook::{webhook_router, JobSink, WebhookState};
