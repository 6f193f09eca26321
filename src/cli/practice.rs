//! CLI command: `rostrum practice`
//!
//! Line-oriented debate loop:
//! - plain lines are arguments sent to the opponent
//! - lines starting with `#` are commands (status, quota, resend, stop, help)

use super::open_governor;
use crate::settings::AppConfig;
use anyhow::{bail, Context};
use rostrum_core::{
    validate_topic, ConversationState, DebateController, DebateSession, DefaultScorer, Exchange,
    Side, SessionSummary, TurnError,
};
use rostrum_llm::{GeminiConfig, GeminiProvider, LlmProvider, QuotaStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const HELP: &str = "\
Commands:
  #status  - Show time, round and quota
  #quota   - Show remaining AI quota
  #resend  - Send your kept argument again
  #stop    - End the session and see your score
  #help    - Show this help";

/// Run a practice session
pub async fn run(
    config: &AppConfig,
    topic: String,
    side: Side,
    minutes: Option<u32>,
) -> anyhow::Result<()> {
    let verdict = validate_topic(&topic);
    if !verdict.is_valid() {
        bail!("Invalid topic: {}", verdict);
    }

    let minutes = minutes.unwrap_or(config.session.default_minutes);
    if minutes == 0 {
        bail!("Session length must be at least one minute");
    }

    let provider = build_provider(config).context("Failed to configure the AI opponent")?;
    let governor = open_governor(config).await;
    let scorer = Arc::new(DefaultScorer::with_fallback(config.session.fallback_score));
    let session = DebateSession::new(topic.trim(), side, minutes.saturating_mul(60), scorer);
    let controller = DebateController::new(session, governor, provider);

    let state = controller.snapshot().await;
    println!("=== Rostrum Practice ===");
    println!("Motion: {}", state.topic);
    println!("You argue for the {}. Time: {}", state.side, format_clock(state.seconds_remaining));
    println!();
    println!("{HELP}");
    println!();
    println!("Enter your arguments (one per line):");

    let countdown = controller.start_countdown();
    let cancel = controller.cancellation_token();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => {
                println!();
                println!("[TIME] The clock ran out.");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.trim() {
                "stop" | "quit" | "exit" => break,
                "status" => print_status(&controller.snapshot().await),
                "quota" => print_quota(&controller.quota_snapshot().await),
                "resend" => {
                    println!("[WAIT] Opponent is thinking...");
                    let outcome = controller.resend_draft().await;
                    if !report_outcome(outcome) {
                        break;
                    }
                }
                "help" => println!("{HELP}"),
                other => println!("[ERROR] Unknown command #{other}. Type #help."),
            }
            continue;
        }

        println!("[WAIT] Opponent is thinking...");
        let outcome = controller.submit_argument(line).await;
        if !report_outcome(outcome) {
            break;
        }
    }

    let summary = controller.stop().await;
    if let Err(e) = countdown.await {
        warn!(error = %e, "Countdown task failed");
    }
    print_summary(&summary);
    Ok(())
}

/// Print the result of one turn. Returns `false` once the session is over.
fn report_outcome(outcome: rostrum_core::Result<Exchange>) -> bool {
    for line in outcome_lines(&outcome) {
        println!("{line}");
    }
    !matches!(outcome, Err(TurnError::Ended))
}

fn outcome_lines(outcome: &rostrum_core::Result<Exchange>) -> Vec<String> {
    match outcome {
        Ok(exchange) => {
            let mut lines = vec![String::new(), format!("[OPPONENT] {}", exchange.rebuttal)];
            if let Some(score) = exchange.score {
                lines.push(format!("[SCORE] Round {}: {}/100", exchange.round, score));
            }
            lines.push(String::new());
            lines
        }
        Err(TurnError::Ended) => Vec::new(),
        Err(TurnError::QuotaDenied {
            reason,
            wait_seconds,
        }) => {
            let mut lines = vec![format!("[QUOTA] {reason}")];
            if let Some(wait) = wait_seconds {
                lines.push(format!("[QUOTA] Your argument is kept; type #resend in {wait}s."));
            }
            lines
        }
        Err(TurnError::Provider { message }) => vec![
            format!("[ERROR] {message}"),
            "[ERROR] Your argument is kept; type #resend to retry.".to_string(),
        ],
        Err(TurnError::NoPendingArgument) => {
            vec!["[ERROR] There is no kept argument to resend.".to_string()]
        }
        Err(e) => vec![format!("[ERROR] {e}")],
    }
}

fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let mut gemini = GeminiConfig::from_env()?
        .with_max_tokens(config.llm.max_tokens)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    if let Some(model) = config.llm.model_override() {
        gemini = gemini.with_model(model);
    }
    info!(model = %gemini.default_model, "AI opponent configured");
    let provider: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(gemini)?);
    Ok(provider)
}

fn print_status(state: &ConversationState) {
    println!("[STATUS]");
    println!("  Time left: {}", format_clock(state.seconds_remaining));
    println!("  Round: {}", state.round);
    println!("  Phase: {}", state.phase);
    if let Some(draft) = &state.draft {
        println!("  Unsent argument: {draft}");
    }
}

fn print_quota(status: &QuotaStatus) {
    println!("[QUOTA]");
    println!("  Calls left today: {}", status.calls_remaining);
    println!("  Tokens left today: {}", status.tokens_remaining);
    println!("  Resets {}", status.next_reset_description);
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("=== Session Summary ===");
    println!("  Rounds completed: {}", summary.rounds_completed);
    println!("  Average score: {:.0}/100", summary.average_score);
    println!("  Experience earned: {} XP", summary.experience);
}

/// Seconds as `m:ss`
fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(300), "5:00");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(0), "0:00");
    }

    #[test]
    fn test_kept_argument_points_to_resend() {
        let denied = Err(TurnError::QuotaDenied {
            reason: "1 request per minute".to_string(),
            wait_seconds: Some(42),
        });
        assert!(outcome_lines(&denied)[1].contains("#resend in 42s"));

        let failed = Err(TurnError::Provider {
            message: "Could not reach the AI service.".to_string(),
        });
        assert!(outcome_lines(&failed)[1].contains("#resend"));
        assert!(report_outcome(failed));

        assert!(outcome_lines(&Err(TurnError::NoPendingArgument))[0].contains("no kept argument"));
        assert!(!report_outcome(Err(TurnError::Ended)));
    }

    #[test]
    fn test_help_lists_resend() {
        assert!(HELP.contains("#resend"));
    }
}
