use super::*;
use crate::clock::ManualClock;
use crate::storage::MemoryStore;
use chrono::TimeZone;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
}

fn unpaced() -> QuotaConfig {
    QuotaConfig {
        calls_per_minute: 0,
        ..QuotaConfig::default()
    }
}

async fn governor_with(
    config: QuotaConfig,
    store: Arc<MemoryStore>,
) -> (QuotaGovernor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let governor = QuotaGovernor::load(config, store, clock.clone()).await;
    (governor, clock)
}

async fn governor(config: QuotaConfig) -> (QuotaGovernor, Arc<ManualClock>) {
    governor_with(config, Arc::new(MemoryStore::new())).await
}

fn stored_state(count: u32, date: NaiveDate) -> String {
    let mut state = QuotaState::zeroed(date);
    state.daily_call_count = count;
    serde_json::to_string(&state).unwrap()
}

#[tokio::test]
async fn test_record_usage_accumulates_calls_and_tokens() {
    let (governor, _clock) = governor(unpaced()).await;

    let amounts = [120, 0, 37, 2_000, 5];
    for tokens in amounts {
        governor.record_usage(tokens).await;
    }

    let state = governor.snapshot().await;
    assert_eq!(state.daily_call_count, amounts.len() as u32);
    assert_eq!(state.daily_token_count, amounts.iter().sum::<u64>());
}

#[tokio::test]
async fn test_call_limit_denies_until_date_advances() {
    let config = QuotaConfig {
        daily_call_limit: 3,
        ..unpaced()
    };
    let (governor, clock) = governor(config).await;

    for _ in 0..3 {
        assert!(governor.check_limits().await.allowed);
        governor.record_usage(10).await;
    }

    for _ in 0..2 {
        let check = governor.check_limits().await;
        assert!(!check.allowed);
        assert!(check.reason.unwrap().contains("call limit"));
        clock.advance(chrono::Duration::hours(1));
    }

    clock.advance(chrono::Duration::days(1));
    assert!(governor.check_limits().await.allowed);
}

#[tokio::test]
async fn test_rollover_on_later_date_resets_counters() {
    let yesterday = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();
    let mut old = QuotaState::zeroed(yesterday);
    old.daily_call_count = 50;
    old.daily_token_count = 14_000;
    old.is_quota_exceeded = true;
    let store = Arc::new(MemoryStore::with_entry(
        QUOTA_STATE_KEY,
        serde_json::to_string(&old).unwrap(),
    ));

    let (governor, _clock) = governor_with(QuotaConfig::default(), store).await;
    let check = governor.check_limits().await;
    assert!(check.allowed);

    let state = governor.snapshot().await;
    assert_eq!(state.daily_call_count, 0);
    assert_eq!(state.daily_token_count, 0);
    assert!(!state.is_quota_exceeded);
    assert_eq!(state.last_reset_date, start().date_naive());
}

#[tokio::test]
async fn test_per_minute_window_denies_second_check() {
    let (governor, clock) = governor(QuotaConfig::default()).await;

    let first = governor.check_limits().await;
    assert!(first.allowed);

    clock.advance(chrono::Duration::seconds(20));
    let second = governor.check_limits().await;
    assert!(!second.allowed);
    assert_eq!(second.wait_seconds, Some(40));
    assert!(second.reason.unwrap().contains("per minute"));
}

#[tokio::test]
async fn test_per_minute_window_frees_after_sixty_seconds() {
    let (governor, clock) = governor(QuotaConfig::default()).await;

    assert!(governor.check_limits().await.allowed);
    governor.record_usage(50).await;

    clock.advance(chrono::Duration::milliseconds(59_500));
    let check = governor.check_limits().await;
    assert!(!check.allowed);
    // 500ms left rounds up to a full second
    assert_eq!(check.wait_seconds, Some(1));

    clock.advance(chrono::Duration::milliseconds(500));
    assert!(governor.check_limits().await.allowed);
}

#[tokio::test]
async fn test_record_usage_fills_reservation() {
    let (governor, _clock) = governor(QuotaConfig::default()).await;

    assert!(governor.check_limits().await.allowed);
    governor.record_usage(42).await;

    let state = governor.snapshot().await;
    assert_eq!(state.call_history.len(), 1);
    assert_eq!(state.call_history[0].tokens, Some(42));
}

#[tokio::test]
async fn test_release_reservation_frees_window_slot() {
    let store = Arc::new(MemoryStore::new());
    let (governor, clock) = governor_with(QuotaConfig::default(), store.clone()).await;

    assert!(governor.check_limits().await.allowed);
    governor.release_reservation().await;

    let state = governor.snapshot().await;
    assert!(state.call_history.is_empty());
    assert_eq!(state.daily_call_count, 0);
    assert_eq!(state.daily_token_count, 0);

    clock.advance(chrono::Duration::seconds(5));
    assert!(governor.check_limits().await.allowed);

    // The release is persisted too
    let raw = store.get(QUOTA_STATE_KEY).await.unwrap().unwrap();
    let persisted: QuotaState = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.call_history.len(), 1);
}

#[tokio::test]
async fn test_release_reservation_keeps_completed_calls() {
    let (governor, _clock) = governor(unpaced()).await;

    assert!(governor.check_limits().await.allowed);
    governor.record_usage(30).await;
    // Nothing open: a no-op
    governor.release_reservation().await;

    let state = governor.snapshot().await;
    assert_eq!(state.call_history.len(), 1);
    assert_eq!(state.call_history[0].tokens, Some(30));
    assert_eq!(state.daily_call_count, 1);
}

#[tokio::test]
async fn test_concrete_limit_scenario() {
    let store = Arc::new(MemoryStore::with_entry(
        QUOTA_STATE_KEY,
        stored_state(49, start().date_naive()),
    ));
    let config = QuotaConfig {
        daily_call_limit: 50,
        ..QuotaConfig::default()
    };
    let (governor, _clock) = governor_with(config, store).await;

    assert!(governor.check_limits().await.allowed);
    governor.record_usage(100).await;
    assert_eq!(governor.snapshot().await.daily_call_count, 50);

    let check = governor.check_limits().await;
    assert!(!check.allowed);
    assert!(check.reason.unwrap().contains("limit"));
    assert!(governor.snapshot().await.is_quota_exceeded);
    assert!(governor.status().await.is_quota_exceeded);
}

#[tokio::test]
async fn test_token_limit_denies() {
    let config = QuotaConfig {
        daily_token_limit: 100,
        ..unpaced()
    };
    let (governor, _clock) = governor(config).await;

    governor.record_usage(100).await;
    let check = governor.check_limits().await;
    assert!(!check.allowed);
    assert!(check.reason.unwrap().contains("token limit"));
    assert!(check.wait_seconds.is_none());
}

#[tokio::test]
async fn test_state_persists_across_reload() {
    let store = Arc::new(MemoryStore::new());
    {
        let (governor, _clock) = governor_with(unpaced(), store.clone()).await;
        governor.record_usage(30).await;
        governor.record_usage(12).await;
    }

    let (reloaded, _clock) = governor_with(unpaced(), store).await;
    let state = reloaded.snapshot().await;
    assert_eq!(state.daily_call_count, 2);
    assert_eq!(state.daily_token_count, 42);
}

#[tokio::test]
async fn test_corrupted_state_fails_open() {
    let store = Arc::new(MemoryStore::with_entry(QUOTA_STATE_KEY, "{not json"));
    let (governor, _clock) = governor_with(QuotaConfig::default(), store).await;

    assert_eq!(governor.snapshot().await, QuotaState::zeroed(start().date_naive()));
    assert!(governor.check_limits().await.allowed);
}

#[tokio::test]
async fn test_future_version_fails_open() {
    let mut state = QuotaState::zeroed(start().date_naive());
    state.version = STATE_VERSION + 1;
    state.daily_call_count = 50;
    let store = Arc::new(MemoryStore::with_entry(
        QUOTA_STATE_KEY,
        serde_json::to_string(&state).unwrap(),
    ));

    let (governor, _clock) = governor_with(QuotaConfig::default(), store).await;
    assert_eq!(governor.snapshot().await.daily_call_count, 0);
}

#[tokio::test]
async fn test_reset_zeroes_and_persists() {
    let store = Arc::new(MemoryStore::new());
    let (governor, _clock) = governor_with(unpaced(), store.clone()).await;
    governor.record_usage(500).await;

    governor.reset().await;
    assert_eq!(governor.snapshot().await.daily_call_count, 0);

    let raw = store.get(QUOTA_STATE_KEY).await.unwrap().unwrap();
    let persisted: QuotaState = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.daily_token_count, 0);
    assert!(persisted.call_history.is_empty());
}

#[tokio::test]
async fn test_history_is_capped() {
    let (governor, _clock) = governor(unpaced()).await;
    for _ in 0..(MAX_HISTORY + 15) {
        governor.record_usage(1).await;
    }
    assert_eq!(governor.snapshot().await.call_history.len(), MAX_HISTORY);
}

#[tokio::test]
async fn test_status_reports_remaining_and_reset() {
    let config = QuotaConfig {
        daily_call_limit: 10,
        daily_token_limit: 1_000,
        calls_per_minute: 1,
    };
    let (governor, _clock) = governor(config).await;
    governor.record_usage(250).await;

    let status = governor.status().await;
    assert_eq!(status.calls_remaining, 9);
    assert_eq!(status.tokens_remaining, 750);
    assert!(!status.is_quota_exceeded);
    // 10:00 -> midnight is 14 hours
    assert_eq!(status.next_reset_description, "at midnight (in 14h 00m)");
}

#[test]
fn test_estimate_tokens_rounds_up() {
    assert_eq!(estimate_tokens("", ""), 0);
    assert_eq!(estimate_tokens("abcd", ""), 1);
    assert_eq!(estimate_tokens("abcd", "e"), 2);
    // counts characters, not bytes
    assert_eq!(estimate_tokens("éééé", ""), 1);
}

#[test]
fn test_format_compact_number() {
    assert_eq!(format_compact_number(500), "500");
    assert_eq!(format_compact_number(1_500), "1.5K");
    assert_eq!(format_compact_number(15_000), "15.0K");
    assert_eq!(format_compact_number(1_500_000), "1.5M");
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(&chrono::Duration::seconds(0)), "now");
    assert_eq!(format_duration(&chrono::Duration::seconds(42)), "42s");
    assert_eq!(format_duration(&chrono::Duration::seconds(125)), "2m 05s");
    assert_eq!(format_duration(&chrono::Duration::seconds(3_900)), "1h 05m");
}
