//! Motion validation
//!
//! Cheap local checks run before a session starts. Interactive front ends
//! can rerun them as the motion is edited, behind a [`crate::Debouncer`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum motion length in characters
pub const MIN_TOPIC_CHARS: usize = 10;
/// Maximum motion length in characters
pub const MAX_TOPIC_CHARS: usize = 200;
/// Minimum number of words
pub const MIN_TOPIC_WORDS: usize = 3;

/// Outcome of [`validate_topic`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TopicVerdict {
    /// Usable motion
    Valid,
    /// Nothing but whitespace and punctuation
    NoContent,
    /// Fewer than [`MIN_TOPIC_CHARS`] characters
    TooShort {
        /// Trimmed length in characters
        chars: usize,
    },
    /// More than [`MAX_TOPIC_CHARS`] characters
    TooLong {
        /// Trimmed length in characters
        chars: usize,
    },
    /// Fewer than [`MIN_TOPIC_WORDS`] words
    TooFewWords {
        /// Words found
        words: usize,
    },
}

impl TopicVerdict {
    /// Whether the motion can be debated
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for TopicVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "looks good"),
            Self::NoContent => write!(f, "the motion needs some words"),
            Self::TooShort { chars } => write!(
                f,
                "too short ({} chars, at least {} needed)",
                chars, MIN_TOPIC_CHARS
            ),
            Self::TooLong { chars } => write!(
                f,
                "too long ({} chars, at most {} allowed)",
                chars, MAX_TOPIC_CHARS
            ),
            Self::TooFewWords { words } => write!(
                f,
                "use at least {} words (found {})",
                MIN_TOPIC_WORDS, words
            ),
        }
    }
}

/// Check a motion. Lengths count characters, not bytes.
#[must_use]
pub fn validate_topic(topic: &str) -> TopicVerdict {
    let trimmed = topic.trim();

    if !trimmed.chars().any(char::is_alphanumeric) {
        return TopicVerdict::NoContent;
    }

    let chars = trimmed.chars().count();
    if chars < MIN_TOPIC_CHARS {
        return TopicVerdict::TooShort { chars };
    }
    if chars > MAX_TOPIC_CHARS {
        return TopicVerdict::TooLong { chars };
    }

    let words = trimmed
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count();
    if words < MIN_TOPIC_WORDS {
        return TopicVerdict::TooFewWords { words };
    }

    TopicVerdict::Valid
}
