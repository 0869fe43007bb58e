//! Chat Error Types

use thiserror::Error;

/// Result type alias for chat-platform operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat-platform errors
#[derive(Error, Debug)]
pub enum ChatError {
    /// API rejected the call (bad request, forbidden, unknown chat)
    #[error("Chat API error: {0}")]
    Api(String),

    /// Rate limiting, 5xx, or transport failure. Retry-worthy.
    #[error("Chat API unavailable: {0}")]
    Transient(String),

    /// Bot lacks invite permission in the target channel. Configuration
    /// error, never retried.
    #[error("Bot has no invite permission in the target channel")]
    NoInvitePermission,

    /// Response did not match the expected envelope
    #[error("Chat API parse error: {0}")]
    Parse(String),

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
