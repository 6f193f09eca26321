//! Error types for rostrum-core
//!
//! Every variant is recoverable: the session stays usable after any of them.

use thiserror::Error;

/// Why a turn did not go through
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// Empty or otherwise unusable submission
    #[error("invalid argument: {0}")]
    Validation(String),

    /// A request is already in flight
    #[error("waiting for the opponent to respond")]
    Busy,

    /// The session has ended
    #[error("the session has ended")]
    Ended,

    /// Dispatch called with nothing submitted
    #[error("no argument is waiting to be sent")]
    NoPendingArgument,

    /// Quota governor refused the request
    #[error("quota denied: {reason}")]
    QuotaDenied {
        /// Denial reason for display
        reason: String,
        /// Seconds to wait before retrying, for per-minute denials
        wait_seconds: Option<u64>,
    },

    /// The AI provider failed
    #[error("opponent unavailable: {message}")]
    Provider {
        /// Sanitized message for display
        message: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TurnError>;
