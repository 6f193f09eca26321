//! Debate Session - turn state machine
//!
//! A session moves through four phases:
//! - AwaitingHuman: the user may submit an argument
//! - HumanSubmitted: an argument is staged, waiting for the quota check
//! - AwaitingOpponent: exactly one AI request is in flight
//! - Ended: time ran out or the user stopped; nothing is accepted
//!
//! The session does no I/O. The caller performs the quota check and the
//! provider call, then reports the outcome back through
//! [`DebateSession::dispatch`], [`DebateSession::receive_response`] and
//! [`DebateSession::receive_failure`].

use crate::error::{Result, TurnError};
use crate::prompt::{build_opponent_request, parse_opponent_reply};
use crate::scoring::{EndReason, SessionScorer, SessionSummary};
use chrono::{DateTime, Utc};
use rostrum_llm::{estimate_tokens, CompletionRequest, QuotaCheck};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one dispatched opponent request
pub type RequestId = u64;

// ============================================================================
// Types
// ============================================================================

/// Who produced a transcript entry / whose turn it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The user
    Human,
    /// The AI opponent
    Opponent,
}

/// Side of the motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Arguing for the motion
    Proposition,
    /// Arguing against the motion
    Opposition,
}

impl Side {
    /// The other side
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::Proposition => Self::Opposition,
            Self::Opposition => Self::Proposition,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proposition => write!(f, "proposition"),
            Self::Opposition => write!(f, "opposition"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proposition" | "pro" | "for" => Ok(Self::Proposition),
            "opposition" | "con" | "against" => Ok(Self::Opposition),
            other => Err(format!(
                "unknown side '{}': expected proposition or opposition",
                other
            )),
        }
    }
}

/// Kind of transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A human argument
    Argument,
    /// An opponent rebuttal
    Rebuttal,
    /// A failed opponent request, shown in the opponent slot
    Error,
}

/// One line of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Speaker
    pub speaker: Speaker,
    /// Text
    pub text: String,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Kind
    pub kind: EntryKind,
    /// Opponent's 0-100 rating of a human argument
    pub score: Option<u8>,
}

/// State machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Waiting for the user
    AwaitingHuman,
    /// Argument staged, not yet dispatched
    HumanSubmitted,
    /// Request in flight
    AwaitingOpponent,
    /// Session over
    Ended,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingHuman => write!(f, "AwaitingHuman"),
            Self::HumanSubmitted => write!(f, "HumanSubmitted"),
            Self::AwaitingOpponent => write!(f, "AwaitingOpponent"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// Read-only view of a session, for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Session id
    pub session_id: Uuid,
    /// Motion being debated
    pub topic: String,
    /// Side the user argues
    pub side: Side,
    /// Current phase
    pub phase: TurnPhase,
    /// Whose turn it is
    pub turn: Speaker,
    /// Current round, starting at 1
    pub round: u32,
    /// True between dispatch and response/failure
    pub pending_request: bool,
    /// Completed entries, oldest first
    pub transcript: Vec<TranscriptEntry>,
    /// Argument staged or left over from a denied/failed request
    pub draft: Option<String>,
    /// Seconds left on the clock
    pub seconds_remaining: u32,
    /// When the session started
    pub started_at: DateTime<Utc>,
}

/// A request the caller must send to the provider
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Id to report the outcome with
    pub request_id: RequestId,
    /// Completion request for the opponent
    pub request: CompletionRequest,
}

/// Result of applying an opponent reply
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Rebuttal text appended to the transcript
    pub rebuttal: String,
    /// Score given to the human argument
    pub score: Option<u8>,
    /// Round that was completed
    pub round: u32,
    /// Estimated tokens to record against the quota
    pub tokens: u64,
}

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    argument: String,
    prompt_text: String,
}

// ============================================================================
// DebateSession
// ============================================================================

/// Turn state machine for one practice debate
pub struct DebateSession {
    state: ConversationState,
    in_flight: Option<InFlight>,
    next_request_id: RequestId,
    summary: Option<SessionSummary>,
    scorer: Arc<dyn SessionScorer>,
}

impl fmt::Debug for DebateSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebateSession")
            .field("state", &self.state)
            .field("in_flight", &self.in_flight)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl DebateSession {
    /// Start a session on `topic` with the user on `side`
    #[must_use]
    pub fn new(
        topic: impl Into<String>,
        side: Side,
        duration_secs: u32,
        scorer: Arc<dyn SessionScorer>,
    ) -> Self {
        let state = ConversationState {
            session_id: Uuid::new_v4(),
            topic: topic.into(),
            side,
            phase: TurnPhase::AwaitingHuman,
            turn: Speaker::Human,
            round: 1,
            pending_request: false,
            transcript: Vec::new(),
            draft: None,
            seconds_remaining: duration_secs,
            started_at: Utc::now(),
        };
        info!(
            session_id = %state.session_id,
            topic = %state.topic,
            side = %side,
            duration_secs,
            "Debate session started"
        );

        Self {
            state,
            in_flight: None,
            next_request_id: 1,
            summary: None,
            scorer,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Owned copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.state.clone()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.state.phase
    }

    /// Summary, once ended
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Stage a human argument.
    pub fn submit(&mut self, text: &str) -> Result<()> {
        match self.state.phase {
            TurnPhase::Ended => return Err(TurnError::Ended),
            TurnPhase::AwaitingOpponent | TurnPhase::HumanSubmitted => {
                debug!(phase = %self.state.phase, "Submission rejected while busy");
                return Err(TurnError::Busy);
            }
            TurnPhase::AwaitingHuman => {}
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(TurnError::Validation("argument is empty".to_string()));
        }

        self.state.draft = Some(text.to_string());
        self.state.phase = TurnPhase::HumanSubmitted;
        debug!(round = self.state.round, "Argument staged");
        Ok(())
    }

    /// Move the staged argument to the opponent, given the quota verdict.
    ///
    /// On denial the session returns to `AwaitingHuman` and keeps the draft.
    pub fn dispatch(&mut self, check: QuotaCheck) -> Result<Dispatch> {
        match self.state.phase {
            TurnPhase::HumanSubmitted => {}
            TurnPhase::Ended => return Err(TurnError::Ended),
            TurnPhase::AwaitingOpponent => return Err(TurnError::Busy),
            TurnPhase::AwaitingHuman => return Err(TurnError::NoPendingArgument),
        }

        let Some(argument) = self.state.draft.clone() else {
            self.state.phase = TurnPhase::AwaitingHuman;
            return Err(TurnError::NoPendingArgument);
        };

        if !check.allowed {
            self.state.phase = TurnPhase::AwaitingHuman;
            let reason = check
                .reason
                .unwrap_or_else(|| "quota exceeded".to_string());
            warn!(reason = %reason, wait_secs = ?check.wait_seconds, "Opponent request denied by quota");
            return Err(TurnError::QuotaDenied {
                reason,
                wait_seconds: check.wait_seconds,
            });
        }

        let request = build_opponent_request(&self.state, &argument);
        let id = self.next_request_id;
        self.next_request_id += 1;

        self.in_flight = Some(InFlight {
            id,
            argument,
            prompt_text: request.full_text(),
        });
        self.state.phase = TurnPhase::AwaitingOpponent;
        self.state.turn = Speaker::Opponent;
        self.state.pending_request = true;
        debug!(request_id = id, round = self.state.round, "Opponent request dispatched");

        Ok(Dispatch {
            request_id: id,
            request,
        })
    }

    /// Apply the opponent's reply. Returns `None` when the reply is stale
    /// or the session has ended; the reply is then discarded.
    pub fn receive_response(&mut self, request_id: RequestId, reply: &str) -> Option<Applied> {
        let in_flight = self.take_in_flight(request_id)?;

        let parsed = parse_opponent_reply(reply);
        let now = Utc::now();
        self.state.transcript.push(TranscriptEntry {
            speaker: Speaker::Human,
            text: in_flight.argument,
            timestamp: now,
            kind: EntryKind::Argument,
            score: parsed.score,
        });
        self.state.transcript.push(TranscriptEntry {
            speaker: Speaker::Opponent,
            text: parsed.rebuttal.clone(),
            timestamp: now,
            kind: EntryKind::Rebuttal,
            score: None,
        });

        let completed = self.state.round;
        self.state.round += 1;
        self.state.draft = None;
        self.back_to_human();

        let tokens = estimate_tokens(&in_flight.prompt_text, reply);
        debug!(round = completed, score = ?parsed.score, tokens, "Opponent reply applied");

        Some(Applied {
            rebuttal: parsed.rebuttal,
            score: parsed.score,
            round: completed,
            tokens,
        })
    }

    /// Record a failed opponent request. Returns `false` when stale.
    pub fn receive_failure(&mut self, request_id: RequestId, message: &str) -> bool {
        if self.take_in_flight(request_id).is_none() {
            return false;
        }

        self.state.transcript.push(TranscriptEntry {
            speaker: Speaker::Opponent,
            text: message.to_string(),
            timestamp: Utc::now(),
            kind: EntryKind::Error,
            score: None,
        });
        self.back_to_human();
        warn!(request_id, error = %message, "Opponent request failed");
        true
    }

    /// Advance the clock by one second. Returns the summary when this tick
    /// ends the session.
    pub fn tick(&mut self) -> Option<SessionSummary> {
        if self.state.phase == TurnPhase::Ended {
            return None;
        }
        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining == 0 {
            return Some(self.end(EndReason::TimeExpired));
        }
        None
    }

    /// End the session at the user's request. Idempotent.
    pub fn stop(&mut self) -> SessionSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        self.end(EndReason::UserStopped)
    }

    fn end(&mut self, reason: EndReason) -> SessionSummary {
        if let Some(flight) = self.in_flight.take() {
            debug!(request_id = flight.id, "Abandoning in-flight request");
        }
        self.state.phase = TurnPhase::Ended;
        self.state.pending_request = false;

        let score = self.scorer.score(&self.state.transcript);
        let summary = SessionSummary {
            session_id: self.state.session_id,
            reason,
            rounds_completed: self.state.round - 1,
            human_turns: self
                .state
                .transcript
                .iter()
                .filter(|e| e.kind == EntryKind::Argument)
                .count(),
            average_score: score.average,
            experience: score.experience,
            ended_at: Utc::now(),
        };
        info!(
            session_id = %summary.session_id,
            reason = ?reason,
            rounds = summary.rounds_completed,
            average = summary.average_score,
            xp = summary.experience,
            "Debate session ended"
        );
        self.summary = Some(summary.clone());
        summary
    }

    fn take_in_flight(&mut self, request_id: RequestId) -> Option<InFlight> {
        if self.state.phase != TurnPhase::AwaitingOpponent {
            debug!(request_id, phase = %self.state.phase, "Discarding late opponent outcome");
            return None;
        }
        match &self.in_flight {
            Some(flight) if flight.id == request_id => self.in_flight.take(),
            _ => {
                debug!(request_id, "Discarding outcome for unknown request");
                None
            }
        }
    }

    fn back_to_human(&mut self) {
        self.state.phase = TurnPhase::AwaitingHuman;
        self.state.turn = Speaker::Human;
        self.state.pending_request = false;
    }
}
