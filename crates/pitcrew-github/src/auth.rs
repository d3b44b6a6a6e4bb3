use crate::error::{GitHubError, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::fmt;

/// App JWT lifetime. GitHub caps app JWTs at 10 minutes; stay under it.
const APP_JWT_LIFETIME_SECS: i64 = 540;

/// Clock-drift allowance applied to `iat`.
const APP_JWT_DRIFT_SECS: i64 = 60;

/// Claims of a GitHub App JWT (RFC 7519 subset GitHub requires)
#[derive(Debug, Serialize)]
struct AppClaims {
    /// Issued at (Unix timestamp, backdated for clock drift)
    iat: i64,
    /// Expiration (Unix timestamp)
    exp: i64,
    /// Issuer: the numeric app id
    iss: String,
}

/// GitHub App credentials used to mint installation tokens.
///
/// Holds the app id and the RS256 signing key parsed from the app's
/// private key PEM. The key material never leaves this struct.
pub struct AppAuth {
    app_id: String,
    key: EncodingKey,
}

impl AppAuth {
    /// Build from the app id and the private key PEM bytes.
    pub fn new(app_id: impl Into<String>, private_key_pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| GitHubError::AppAuth(format!("invalid app private key: {e}")))?;
        Ok(Self {
            app_id: app_id.into(),
            key,
        })
    }

    /// Sign a short-lived app JWT for the token-exchange call.
    pub fn app_jwt(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - APP_JWT_DRIFT_SECS,
            exp: now + APP_JWT_LIFETIME_SECS,
            iss: self.app_id.clone(),
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }
}

impl fmt::Debug for AppAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppAuth")
            .field("app_id", &self.app_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Short-lived installation access token.
///
/// The secret is reachable only through [`InstallationToken::secret`];
/// `Debug` output is redacted so tokens cannot leak through logs.
#[derive(Clone)]
pub struct InstallationToken {
    secret: String,
    expires_at: String,
}

impl InstallationToken {
    pub fn new(secret: String, expires_at: String) -> Self {
        Self { secret, expires_at }
    }

    /// The bearer token value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// RFC 3339 expiry reported by the platform (≤ 1 h out).
    pub fn expires_at(&self) -> &str {
        &self.expires_at
    }
}

impl fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
