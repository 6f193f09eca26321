//! Quota Governor
//!
//! Gates every outbound AI request against three limits:
//! - daily call count
//! - daily estimated token count
//! - calls per trailing 60-second window
//!
//! Counters live in a single [`QuotaState`] record persisted as JSON in a
//! [`KeyValueStore`]. Daily counters roll over lazily: every operation first
//! compares the local calendar date against `last_reset_date`, there is no
//! background timer.

use crate::clock::Clock;
use crate::storage::KeyValueStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage key of the persisted quota record
pub const QUOTA_STATE_KEY: &str = "rostrum.quota_state";

/// Current persisted record version
const STATE_VERSION: u32 = 1;

/// Length of the per-minute window in seconds
const WINDOW_SECS: i64 = 60;

/// Maximum call records kept in history
const MAX_HISTORY: usize = 60;

/// Characters per estimated token
const CHARS_PER_TOKEN: usize = 4;

// ============================================================================
// Configuration
// ============================================================================

/// Quota limits (deserializable from TOML)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum AI calls per local calendar day
    #[serde(default = "default_daily_call_limit")]
    pub daily_call_limit: u32,
    /// Maximum estimated tokens per local calendar day
    #[serde(default = "default_daily_token_limit")]
    pub daily_token_limit: u64,
    /// Maximum calls in any trailing 60-second window (0 disables pacing)
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute: u32,
}

fn default_daily_call_limit() -> u32 {
    50
}
fn default_daily_token_limit() -> u64 {
    15_000
}
fn default_calls_per_minute() -> u32 {
    1
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_call_limit: default_daily_call_limit(),
            daily_token_limit: default_daily_token_limit(),
            calls_per_minute: default_calls_per_minute(),
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// One outbound call in the per-minute history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// When the call was admitted
    pub at: DateTime<Utc>,
    /// Estimated tokens, `None` while the admitted call has not been recorded
    pub tokens: Option<u64>,
}

/// Persisted quota counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Record version
    #[serde(default = "current_version")]
    pub version: u32,
    /// Calls made since `last_reset_date`
    pub daily_call_count: u32,
    /// Estimated tokens used since `last_reset_date`
    pub daily_token_count: u64,
    /// Local date the daily counters belong to
    pub last_reset_date: NaiveDate,
    /// Set when a daily limit denied a request
    pub is_quota_exceeded: bool,
    /// Recent calls, oldest first
    #[serde(default)]
    pub call_history: Vec<CallRecord>,
}

fn current_version() -> u32 {
    STATE_VERSION
}

impl QuotaState {
    /// Fresh state for `today`
    #[must_use]
    pub fn zeroed(today: NaiveDate) -> Self {
        Self {
            version: STATE_VERSION,
            daily_call_count: 0,
            daily_token_count: 0,
            last_reset_date: today,
            is_quota_exceeded: false,
            call_history: Vec::new(),
        }
    }

    /// Reset daily counters if `today` differs from `last_reset_date`.
    /// Returns `true` when a rollover happened.
    fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_date == today {
            return false;
        }
        self.daily_call_count = 0;
        self.daily_token_count = 0;
        self.is_quota_exceeded = false;
        self.last_reset_date = today;
        true
    }

    /// Calls inside the trailing window ending at `now`, oldest first
    fn calls_in_window(&self, now: DateTime<Utc>) -> impl Iterator<Item = &CallRecord> {
        let window_start = now - chrono::Duration::seconds(WINDOW_SECS);
        self.call_history.iter().filter(move |r| r.at > window_start)
    }

    fn trim_history(&mut self) {
        if self.call_history.len() > MAX_HISTORY {
            let drain_count = self.call_history.len() - MAX_HISTORY;
            self.call_history.drain(0..drain_count);
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of [`QuotaGovernor::check_limits`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCheck {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Human-readable denial reason
    pub reason: Option<String>,
    /// Seconds until the per-minute window frees a slot
    pub wait_seconds: Option<u64>,
}

impl QuotaCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            wait_seconds: None,
        }
    }

    fn denied(reason: String, wait_seconds: Option<u64>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            wait_seconds,
        }
    }
}

/// Read-only projection for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    /// Calls left today
    pub calls_remaining: u32,
    /// Estimated tokens left today
    pub tokens_remaining: u64,
    /// Whether a daily limit has been hit
    pub is_quota_exceeded: bool,
    /// When the daily counters reset, e.g. "at midnight (in 3h 05m)"
    pub next_reset_description: String,
}

// ============================================================================
// QuotaGovernor
// ============================================================================

/// Daily and per-minute limiter for outbound AI calls.
///
/// Construct once at startup and share as `Arc<QuotaGovernor>`.
pub struct QuotaGovernor {
    config: QuotaConfig,
    state: RwLock<QuotaState>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QuotaGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGovernor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QuotaGovernor {
    /// Load persisted state from `store`.
    ///
    /// Missing or unreadable records start from a zeroed state.
    pub async fn load(
        config: QuotaConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let today = clock.today();
        let state = match store.get(QUOTA_STATE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<QuotaState>(&raw) {
                Ok(mut state) if state.version <= STATE_VERSION => {
                    state.trim_history();
                    debug!(
                        calls = state.daily_call_count,
                        tokens = state.daily_token_count,
                        date = %state.last_reset_date,
                        "Quota state loaded"
                    );
                    state
                }
                Ok(state) => {
                    warn!(
                        version = state.version,
                        "Quota state has unknown version, starting from zero"
                    );
                    QuotaState::zeroed(today)
                }
                Err(e) => {
                    warn!(error = %e, "Quota state is corrupted, starting from zero");
                    QuotaState::zeroed(today)
                }
            },
            Ok(None) => QuotaState::zeroed(today),
            Err(e) => {
                warn!(error = %e, "Failed to read quota state, starting from zero");
                QuotaState::zeroed(today)
            }
        };

        Self {
            config,
            state: RwLock::new(state),
            store,
            clock,
        }
    }

    /// Configured limits
    #[must_use]
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Decide whether a new outbound request may proceed.
    ///
    /// An allowed check reserves a slot in the per-minute window; the next
    /// [`record_usage`](Self::record_usage) fills it in.
    pub async fn check_limits(&self) -> QuotaCheck {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let rolled = self.roll_over(&mut state);

        if state.daily_call_count >= self.config.daily_call_limit {
            state.is_quota_exceeded = true;
            self.persist(&state).await;
            warn!(
                calls = state.daily_call_count,
                limit = self.config.daily_call_limit,
                "Daily call limit reached"
            );
            return QuotaCheck::denied(
                format!(
                    "daily call limit reached ({}/{} calls)",
                    state.daily_call_count, self.config.daily_call_limit
                ),
                None,
            );
        }

        if state.daily_token_count >= self.config.daily_token_limit {
            state.is_quota_exceeded = true;
            self.persist(&state).await;
            warn!(
                tokens = state.daily_token_count,
                limit = self.config.daily_token_limit,
                "Daily token limit reached"
            );
            return QuotaCheck::denied(
                format!(
                    "daily token limit reached ({}/{} tokens)",
                    state.daily_token_count, self.config.daily_token_limit
                ),
                None,
            );
        }

        if self.config.calls_per_minute > 0 {
            let in_window: Vec<&CallRecord> = state.calls_in_window(now).collect();
            if in_window.len() >= self.config.calls_per_minute as usize {
                let wait = in_window
                    .iter()
                    .map(|r| r.at)
                    .min()
                    .map(|oldest| seconds_until_exit(oldest, now))
                    .unwrap_or(1);
                if rolled {
                    self.persist(&state).await;
                }
                debug!(
                    in_window = in_window.len(),
                    limit = self.config.calls_per_minute,
                    wait_secs = wait,
                    "Per-minute limit reached"
                );
                return QuotaCheck::denied(
                    format!(
                        "rate limit: at most {} call(s) per minute, try again in {}s",
                        self.config.calls_per_minute, wait
                    ),
                    Some(wait),
                );
            }
        }

        state.call_history.push(CallRecord {
            at: now,
            tokens: None,
        });
        state.trim_history();
        self.persist(&state).await;

        QuotaCheck::allowed()
    }

    /// Record a completed call and its estimated token cost.
    pub async fn record_usage(&self, tokens: u64) {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        self.roll_over(&mut state);

        state.daily_call_count = state.daily_call_count.saturating_add(1);
        state.daily_token_count = state.daily_token_count.saturating_add(tokens);

        match state.call_history.iter().rposition(|r| r.tokens.is_none()) {
            Some(idx) => state.call_history[idx].tokens = Some(tokens),
            None => state.call_history.push(CallRecord {
                at: now,
                tokens: Some(tokens),
            }),
        }
        state.trim_history();

        debug!(
            tokens,
            calls = state.daily_call_count,
            total_tokens = state.daily_token_count,
            "Recorded AI usage"
        );
        self.persist(&state).await;
    }

    /// Give back the newest open reservation after a call that never
    /// completed. Counters are untouched.
    pub async fn release_reservation(&self) {
        let mut state = self.state.write().await;
        match state.call_history.iter().rposition(|r| r.tokens.is_none()) {
            Some(idx) => {
                state.call_history.remove(idx);
                debug!("Released per-minute reservation");
                self.persist(&state).await;
            }
            None => debug!("No reservation to release"),
        }
    }

    /// Remaining allowance for display.
    pub async fn status(&self) -> QuotaStatus {
        let mut state = self.state.write().await;
        if self.roll_over(&mut state) {
            self.persist(&state).await;
        }

        let local_now = self.clock.local_now();
        let next_midnight = state
            .last_reset_date
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        let next_reset_description = match next_midnight {
            Some(midnight) => format!(
                "at midnight (in {})",
                format_duration(&(midnight - local_now))
            ),
            None => "at midnight".to_string(),
        };

        QuotaStatus {
            calls_remaining: self
                .config
                .daily_call_limit
                .saturating_sub(state.daily_call_count),
            tokens_remaining: self
                .config
                .daily_token_limit
                .saturating_sub(state.daily_token_count),
            is_quota_exceeded: state.is_quota_exceeded,
            next_reset_description,
        }
    }

    /// Zero all counters and history. Administrative use only.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = QuotaState::zeroed(self.clock.today());
        info!("Quota state reset");
        self.persist(&state).await;
    }

    /// Copy of the current state for debugging.
    pub async fn snapshot(&self) -> QuotaState {
        self.state.read().await.clone()
    }

    fn roll_over(&self, state: &mut QuotaState) -> bool {
        let today = self.clock.today();
        let previous = state.last_reset_date;
        let rolled = state.roll_over(today);
        if rolled {
            info!(from = %previous, to = %today, "Daily quota rolled over");
        }
        rolled
    }

    async fn persist(&self, state: &QuotaState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to serialize quota state");
                return;
            }
        };
        if let Err(e) = self.store.set(QUOTA_STATE_KEY, &raw).await {
            warn!(error = %e, "Failed to persist quota state");
        }
    }
}

/// Whole seconds (rounded up, at least 1) until a call made at `at` leaves
/// the window.
fn seconds_until_exit(at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let exit = at + chrono::Duration::seconds(WINDOW_SECS);
    let remaining_ms = (exit - now).num_milliseconds().max(0) as u64;
    remaining_ms.div_ceil(1000).max(1)
}

/// Approximate token count for a prompt/response pair.
///
/// Uses one token per four characters. This is a budgeting heuristic and
/// will not match the provider's own accounting.
#[must_use]
pub fn estimate_tokens(prompt: &str, response: &str) -> u64 {
    let chars = prompt.chars().count() + response.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

/// Format a number compactly: 1500 → "1.5K", 2000000 → "2.0M".
#[must_use]
pub fn format_compact_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Format a chrono::Duration as human-readable "Xh YYm" / "Xm YYs" / "Xs".
#[must_use]
pub fn format_duration(d: &chrono::Duration) -> String {
    let total_secs = d.num_seconds();
    if total_secs <= 0 {
        return "now".to_string();
    }
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests;
