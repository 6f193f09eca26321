//! Rostrum Core - Debate session engine
//!
//! This crate drives a practice debate between a human and an AI opponent:
//! - Session: turn state machine, transcript, countdown
//! - Controller: async driver wiring the session to a provider and the
//!   quota governor
//! - Prompt: opponent instructions and reply/score parsing
//! - Scoring: end-of-session summary policy
//! - Topic / Debounce: validate-as-you-type topic checks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod controller;
pub mod debounce;
pub mod error;
pub mod prompt;
pub mod scoring;
pub mod session;
pub mod topic;

pub use controller::{DebateController, Exchange};
pub use debounce::Debouncer;
pub use error::{Result, TurnError};
pub use prompt::{build_opponent_request, parse_opponent_reply, OpponentReply};
pub use scoring::{DefaultScorer, EndReason, SessionScore, SessionScorer, SessionSummary};
pub use session::{
    Applied, ConversationState, DebateSession, Dispatch, EntryKind, RequestId, Side, Speaker,
    TranscriptEntry, TurnPhase,
};
pub use topic::{validate_topic, TopicVerdict};
