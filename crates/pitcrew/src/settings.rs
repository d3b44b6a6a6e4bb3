//! Process-wide configuration, read once at startup from the
//! environment. A missing required variable is a startup error, never a
//! per-job error.

use anyhow::{Context, Result};
use pitcrew_github::AppAuth;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,

    /// GitHub App id (numeric, but carried as the string GitHub expects
    /// in the JWT issuer claim).
    pub app_id: String,

    /// Path to the app's RSA private key PEM.
    pub private_key_path: PathBuf,

    /// Broker address for the job queue and the baseline store.
    pub redis_url: String,

    /// Listen address of the webhook endpoint.
    pub bind: String,
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("required environment variable {name} is not set"))
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            webhook_secret: require("GITHUB_WEBHOOK_SECRET")?,
            app_id: require("GITHUB_APP_ID")?,
            private_key_path: require("GITHUB_APP_PRIVATE_KEY_PATH")?.into(),
            redis_url: require("REDIS_URL")?,
            bind: std::env::var("PITCREW_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    /// Load and parse the app signing key.
    pub fn app_auth(&self) -> Result<AppAuth> {
        let pem = std::fs::read(&self.private_key_path).with_context(|| {
            format!(
                "failed to read app private key from {}",
                self.private_key_path.display()
            )
        })?;
        AppAuth::new(&self.app_id, &pem).context("failed to parse app private key")
    }
}
