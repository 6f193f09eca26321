//! Opponent prompts
//!
//! Builds the completion request for the AI opponent and splits its reply
//! into the rebuttal and the `SCORE: n` rating of the user's argument.

use crate::session::{ConversationState, EntryKind, Speaker};
use regex::Regex;
use rostrum_llm::CompletionRequest;
use std::sync::LazyLock;

/// Transcript entries included as context
const CONTEXT_ENTRIES: usize = 6;

/// Upper bound on opponent reply length
const MAX_REPLY_TOKENS: u32 = 600;

static SCORE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_]*score[\s*_]*[:=\-][\s*_]*(\d{1,3})\b.*$")
        .expect("SCORE_REGEX is a compile-time constant")
});

/// Opponent reply split into parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentReply {
    /// Rebuttal text shown to the user
    pub rebuttal: String,
    /// Rating of the user's argument, 0-100
    pub score: Option<u8>,
}

fn system_prompt(state: &ConversationState) -> String {
    format!(
        "You are a skilled competitive debater acting as a practice opponent.\n\
         Motion: \"{topic}\"\n\
         The user argues for the {human}; you argue for the {ai}.\n\
         Reply to the user's latest argument with a focused rebuttal of at most \
         150 words. Address their strongest point directly and stay civil.\n\
         After the rebuttal, on its own final line, rate the user's argument for \
         logic, evidence and clarity as `SCORE: <0-100>`.",
        topic = state.topic,
        human = state.side,
        ai = state.side.opponent(),
    )
}

/// Build the opponent request for `argument`
#[must_use]
pub fn build_opponent_request(state: &ConversationState, argument: &str) -> CompletionRequest {
    let relevant: Vec<_> = state
        .transcript
        .iter()
        .filter(|e| e.kind != EntryKind::Error)
        .collect();
    let history: Vec<String> = relevant[relevant.len().saturating_sub(CONTEXT_ENTRIES)..]
        .iter()
        .map(|e| {
            let who = match e.speaker {
                Speaker::Human => "User",
                Speaker::Opponent => "You",
            };
            format!("{}: {}", who, e.text)
        })
        .collect();

    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Debate so far:\n");
        prompt.push_str(&history.join("\n"));
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Round {} argument from the user:\n{}",
        state.round, argument
    ));

    CompletionRequest::new(prompt)
        .with_system(system_prompt(state))
        .with_max_tokens(MAX_REPLY_TOKENS)
        .with_temperature(0.7)
}

/// Split a raw reply into rebuttal and score.
///
/// The last `SCORE:` line wins; values above 100 are clamped. A reply
/// without a score line is returned whole.
#[must_use]
pub fn parse_opponent_reply(raw: &str) -> OpponentReply {
    let Some(caps) = SCORE_REGEX.captures_iter(raw).last() else {
        return OpponentReply {
            rebuttal: raw.trim().to_string(),
            score: None,
        };
    };

    let score = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map(|n| n.min(100) as u8);

    let rebuttal = SCORE_REGEX.replace_all(raw, "").trim().to_string();

    OpponentReply {
        rebuttal: if rebuttal.is_empty() {
            raw.trim().to_string()
        } else {
            rebuttal
        },
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DefaultScorer;
    use crate::session::{DebateSession, Side};
    use rostrum_llm::QuotaCheck;
    use std::sync::Arc;

    fn allowed() -> QuotaCheck {
        QuotaCheck {
            allowed: true,
            reason: None,
            wait_seconds: None,
        }
    }

    #[test]
    fn test_parse_reply_with_score() {
        let reply = parse_opponent_reply("Your point ignores enforcement costs.\n\nSCORE: 72");
        assert_eq!(reply.rebuttal, "Your point ignores enforcement costs.");
        assert_eq!(reply.score, Some(72));
    }

    #[test]
    fn test_parse_reply_markdown_score_and_clamp() {
        let reply = parse_opponent_reply("Fair, but weak.\n**Score:** 140/100");
        assert_eq!(reply.score, Some(100));
        assert_eq!(reply.rebuttal, "Fair, but weak.");
    }

    #[test]
    fn test_parse_reply_without_score() {
        let reply = parse_opponent_reply("  Just a rebuttal.  ");
        assert_eq!(reply.rebuttal, "Just a rebuttal.");
        assert_eq!(reply.score, None);
    }

    #[test]
    fn test_parse_reply_score_only_keeps_text() {
        let reply = parse_opponent_reply("SCORE: 40");
        assert_eq!(reply.score, Some(40));
        assert_eq!(reply.rebuttal, "SCORE: 40");
    }

    #[test]
    fn test_request_includes_topic_sides_and_history() {
        let mut session = DebateSession::new(
            "Cities should ban cars downtown",
            Side::Opposition,
            300,
            Arc::new(DefaultScorer::default()),
        );
        session.submit("Cars bring shoppers.").unwrap();
        let first = session.dispatch(allowed()).unwrap();
        assert!(first.request.prompt.contains("Round 1"));
        assert!(!first.request.prompt.contains("Debate so far"));

        session.receive_response(first.request_id, "Transit brings more.\nSCORE: 55");
        session.submit("Deliveries need access.").unwrap();
        let second = session.dispatch(allowed()).unwrap();

        let system = second.request.system.unwrap();
        assert!(system.contains("Cities should ban cars downtown"));
        assert!(system.contains("user argues for the opposition"));
        assert!(system.contains("you argue for the proposition"));
        assert!(second.request.prompt.contains("User: Cars bring shoppers."));
        assert!(second.request.prompt.contains("You: Transit brings more."));
        assert!(second
            .request
            .prompt
            .contains("Round 2 argument from the user:\nDeliveries need access."));
    }
}
