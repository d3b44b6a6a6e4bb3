use thiserror::Error;

/// GitHub integration error types
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Unauthorized: invalid credentials or token")]
    Unauthorized,

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unexpected HTTP status {0}: {1}")]
    UnexpectedStatus(u16, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("App authentication error: {0}")]
    AppAuth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for GitHubError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        GitHubError::AppAuth(err.to_string())
    }
}

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, GitHubError>;
