//! Executor error types.

use thiserror::Error;

/// Errors raised while building or sending an upstream request.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Endpoint is neither a `/path` nor an allowed absolute URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// OAuth requests must target the OAuth host
    #[error("Absolute URLs are not allowed for OAuth requests: {0}")]
    AbsoluteOAuthUrl(String),

    /// OAuth requested with no token configured
    #[error("No OAuth token configured")]
    MissingToken,

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] relay_config_and_utils::CoreError),
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
