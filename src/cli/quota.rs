//! CLI command: `rostrum quota`
//!
//! Displays today's AI usage against the configured limits, or clears it.

use super::open_governor;
use crate::settings::AppConfig;
use rostrum_llm::{format_compact_number, QuotaConfig, QuotaState, QuotaStatus};

/// `rostrum quota reset`
pub async fn reset(config: &AppConfig) -> anyhow::Result<()> {
    let governor = open_governor(config).await;
    governor.reset().await;
    println!("Quota counters reset.");
    Ok(())
}

/// `rostrum quota status [--json]`
pub async fn status(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let governor = open_governor(config).await;
    let status = governor.status().await;
    let state = governor.snapshot().await;

    if json {
        let output = status_json(&config.quota, &state, &status);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(&config.quota, &state, &status);
    }
    Ok(())
}

fn status_json(
    limits: &QuotaConfig,
    state: &QuotaState,
    status: &QuotaStatus,
) -> serde_json::Value {
    serde_json::json!({
        "date": state.last_reset_date.to_string(),
        "calls": {
            "used": state.daily_call_count,
            "limit": limits.daily_call_limit,
            "remaining": status.calls_remaining,
        },
        "tokens": {
            "used": state.daily_token_count,
            "limit": limits.daily_token_limit,
            "remaining": status.tokens_remaining,
        },
        "calls_per_minute": limits.calls_per_minute,
        "exceeded": status.is_quota_exceeded,
        "reset": status.next_reset_description,
    })
}

fn print_table(limits: &QuotaConfig, state: &QuotaState, status: &QuotaStatus) {
    println!();
    println!("  AI Quota ({})", state.last_reset_date);
    println!("  {}", "-".repeat(48));
    println!(
        "  {:<12} {}",
        "Calls",
        format_ratio(u64::from(state.daily_call_count), u64::from(limits.daily_call_limit), false)
    );
    println!(
        "  {:<12} {}",
        "Tokens",
        format_ratio(state.daily_token_count, limits.daily_token_limit, true)
    );
    let pacing = if limits.calls_per_minute == 0 {
        "off".to_string()
    } else {
        format!("{} call(s) / minute", limits.calls_per_minute)
    };
    println!("  {:<12} {}", "Pacing", pacing);
    println!("  {:<12} {}", "Resets", status.next_reset_description);
    println!("  {}", "-".repeat(48));
    if status.is_quota_exceeded {
        println!("  !! Daily limit reached, practice resumes after the reset.");
    }
    println!();
}

// ── helpers ──────────────────────────────────────────────────────────────

fn format_ratio(used: u64, limit: u64, compact: bool) -> String {
    let pct = if limit > 0 {
        (used as f64 / limit as f64 * 100.0).min(100.0) as u64
    } else {
        0
    };
    if compact {
        format!(
            "{} / {} ({}%)",
            format_compact_number(used),
            format_compact_number(limit),
            pct
        )
    } else {
        format!("{} / {} ({}%)", used, limit, pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(49, 50, false), "49 / 50 (98%)");
        assert_eq!(format_ratio(12_500, 15_000, true), "12.5K / 15.0K (83%)");
        assert_eq!(format_ratio(3, 0, false), "3 / 0 (0%)");
    }

    #[test]
    fn test_status_json_shape() {
        let limits = QuotaConfig::default();
        let mut state = QuotaState::zeroed(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        state.daily_call_count = 50;
        state.daily_token_count = 900;
        state.is_quota_exceeded = true;
        let status = QuotaStatus {
            calls_remaining: 0,
            tokens_remaining: 14_100,
            is_quota_exceeded: true,
            next_reset_description: "at midnight (in 2h 00m)".to_string(),
        };

        let json = status_json(&limits, &state, &status);
        assert_eq!(json["date"], "2026-03-10");
        assert_eq!(json["calls"]["used"], 50);
        assert_eq!(json["calls"]["remaining"], 0);
        assert_eq!(json["tokens"]["limit"], 15_000);
        assert_eq!(json["exceeded"], true);
    }
}
