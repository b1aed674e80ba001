//! Error types for the skywatch client

use thiserror::Error;

/// Core error type for skywatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing input, or an unresolvable universe. Not retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials or account rejected by the lobby. Not retried without
    /// new credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The game server no longer accepts the session. Internal signal that
    /// triggers a single transparent re-authentication and retry.
    #[error("session expired")]
    AuthExpired,

    /// Transient network failure, surfaced only once the retry budget is
    /// exhausted.
    #[error("request failed after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    /// Backend response did not match the expected structure (schema drift).
    #[error("parse error: {0}")]
    Parse(String),

    /// Non-retryable request failure (malformed request, unexpected 4xx).
    #[error("request rejected: {0}")]
    Fatal(String),

    /// Query issued without a live session (never connected, logged out, or
    /// re-authentication failed for good).
    #[error("not connected")]
    NotConnected,
}

impl Error {
    /// Whether the operation may succeed when retried with the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }

    /// Whether this is the internal session-rejection signal.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired)
    }
}

/// Result type alias for skywatch operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
