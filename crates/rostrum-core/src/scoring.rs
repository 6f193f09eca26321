//! End-of-session scoring
//!
//! Scoring is application policy, so the session only asks a
//! [`SessionScorer`] for numbers. [`DefaultScorer`] averages the opponent's
//! per-argument ratings and awards a simple experience amount.

use crate::session::{EntryKind, TranscriptEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Average used when no argument was scored
pub const FALLBACK_AVERAGE: f64 = 75.0;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The countdown reached zero
    TimeExpired,
    /// The user stopped the session
    UserStopped,
}

/// Numbers produced by a scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionScore {
    /// Aggregate argument score, 0-100
    pub average: f64,
    /// Experience awarded
    pub experience: u32,
}

/// Final report of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id
    pub session_id: Uuid,
    /// Why it ended
    pub reason: EndReason,
    /// Completed human/opponent exchanges
    pub rounds_completed: u32,
    /// Human arguments in the transcript
    pub human_turns: usize,
    /// Aggregate argument score
    pub average_score: f64,
    /// Experience awarded
    pub experience: u32,
    /// When the session ended
    pub ended_at: DateTime<Utc>,
}

/// Scoring policy supplied by the application
pub trait SessionScorer: Send + Sync {
    /// Score a finished transcript
    fn score(&self, transcript: &[TranscriptEntry]) -> SessionScore;
}

/// Mean of scored arguments; XP = 10 per argument plus half the average
#[derive(Debug, Clone, Copy)]
pub struct DefaultScorer {
    fallback: f64,
}

impl Default for DefaultScorer {
    fn default() -> Self {
        Self {
            fallback: FALLBACK_AVERAGE,
        }
    }
}

impl DefaultScorer {
    /// Scorer with a custom fallback average
    #[must_use]
    pub fn with_fallback(fallback: f64) -> Self {
        Self { fallback }
    }
}

impl SessionScorer for DefaultScorer {
    fn score(&self, transcript: &[TranscriptEntry]) -> SessionScore {
        let arguments: Vec<&TranscriptEntry> = transcript
            .iter()
            .filter(|e| e.kind == EntryKind::Argument)
            .collect();

        let scores: Vec<f64> = arguments
            .iter()
            .filter_map(|e| e.score)
            .map(f64::from)
            .collect();

        let average = if scores.is_empty() {
            self.fallback
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        let experience = arguments.len() as u32 * 10 + (average / 2.0).round() as u32;

        SessionScore {
            average,
            experience,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;

    fn argument(score: Option<u8>) -> TranscriptEntry {
        TranscriptEntry {
            speaker: Speaker::Human,
            text: "argument".to_string(),
            timestamp: Utc::now(),
            kind: EntryKind::Argument,
            score,
        }
    }

    fn rebuttal() -> TranscriptEntry {
        TranscriptEntry {
            speaker: Speaker::Opponent,
            text: "rebuttal".to_string(),
            timestamp: Utc::now(),
            kind: EntryKind::Rebuttal,
            score: None,
        }
    }

    #[test]
    fn test_empty_transcript_uses_fallback() {
        let score = DefaultScorer::default().score(&[]);
        assert_eq!(score.average, 75.0);
        assert_eq!(score.experience, 38);
    }

    #[test]
    fn test_average_ignores_unscored_and_opponent_entries() {
        let transcript = vec![
            argument(Some(80)),
            rebuttal(),
            argument(None),
            rebuttal(),
            argument(Some(60)),
            rebuttal(),
        ];
        let score = DefaultScorer::default().score(&transcript);
        assert_eq!(score.average, 70.0);
        // 3 arguments * 10 + 35
        assert_eq!(score.experience, 65);
    }

    #[test]
    fn test_custom_fallback() {
        let score = DefaultScorer::with_fallback(50.0).score(&[argument(None)]);
        assert_eq!(score.average, 50.0);
        assert_eq!(score.experience, 35);
    }
}
