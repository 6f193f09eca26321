//! Rostrum LLM - AI provider access and quota governance
//!
//! This crate provides the outbound side of Rostrum:
//! - Provider: `LlmProvider` trait for text generation
//! - Gemini: Google Gemini provider over the Generative Language API
//! - Mock: queued responses for tests and offline runs
//! - Quota: daily call/token limits and per-minute pacing, persisted
//! - Storage: durable key-value store used for persistence
//! - Clock: injectable wall clock for rollover and window checks

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod completion;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod provider;
pub mod quota;
pub mod storage;
pub mod util;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use quota::{
    estimate_tokens, format_compact_number, format_duration, CallRecord, QuotaCheck, QuotaConfig,
    QuotaGovernor, QuotaState, QuotaStatus, QUOTA_STATE_KEY,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
