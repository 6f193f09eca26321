//! Error types for rostrum-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Rate limit exceeded on the provider side
    #[error("rate limit exceeded")]
    RateLimit,

    /// Retryable 5xx from the provider
    #[error("server error: {0}")]
    ServerError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Key-value storage failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Message suitable for showing inline in a transcript.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured(_) => {
                "The AI opponent is not configured. Set GEMINI_API_KEY and try again.".to_string()
            }
            Self::RateLimit => "The AI service is busy. Please try again shortly.".to_string(),
            Self::Network(_) => "Could not reach the AI service. Check your connection.".to_string(),
            Self::ServerError(_) => "The AI service had an internal error. Please retry.".to_string(),
            Self::Api(msg) | Self::InvalidResponse(msg) => {
                crate::util::redact_provider_message(msg)
            }
            Self::Storage(msg) => format!("Storage problem: {msg}"),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
