//! Debate Controller - async driver for a [`DebateSession`]
//!
//! Wires the synchronous state machine to the quota governor and the AI
//! provider. The session lock is released while the provider call is in
//! flight, so snapshots and further submissions (rejected as busy) never
//! wait on the network.

use crate::error::{Result, TurnError};
use crate::scoring::SessionSummary;
use crate::session::{ConversationState, DebateSession, TurnPhase};
use rostrum_llm::{estimate_tokens, LlmProvider, QuotaGovernor, QuotaStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Countdown resolution
const TICK: Duration = Duration::from_secs(1);

/// One completed human/opponent exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// Opponent rebuttal
    pub rebuttal: String,
    /// Opponent's rating of the argument
    pub score: Option<u8>,
    /// Round that was completed
    pub round: u32,
    /// Estimated tokens recorded against the quota
    pub tokens: u64,
}

/// Drives one debate session
#[derive(Clone)]
pub struct DebateController {
    session: Arc<Mutex<DebateSession>>,
    governor: Arc<QuotaGovernor>,
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for DebateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebateController")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl DebateController {
    /// Create a controller around a fresh session
    #[must_use]
    pub fn new(
        session: DebateSession,
        governor: Arc<QuotaGovernor>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            governor,
            provider,
            model: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the provider's default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Token cancelled when the session ends
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Submit an argument and wait for the opponent's reply.
    ///
    /// Quota denials and provider failures return the session to the user
    /// with the argument kept as a draft.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn submit_argument(&self, text: &str) -> Result<Exchange> {
        let dispatch = {
            let mut session = self.session.lock().await;
            session.submit(text)?;
            let check = self.governor.check_limits().await;
            session.dispatch(check)?
        };

        let mut request = dispatch.request;
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        let prompt_text = request.full_text();

        debug!(request_id = dispatch.request_id, provider = self.provider.name(), "Calling opponent");
        let outcome = self.provider.complete(request).await;

        match outcome {
            Ok(response) => {
                let applied = self
                    .session
                    .lock()
                    .await
                    .receive_response(dispatch.request_id, &response.content);

                match applied {
                    Some(applied) => {
                        self.governor.record_usage(applied.tokens).await;
                        Ok(Exchange {
                            rebuttal: applied.rebuttal,
                            score: applied.score,
                            round: applied.round,
                            tokens: applied.tokens,
                        })
                    }
                    None => {
                        // The call still reached the provider
                        let tokens = estimate_tokens(&prompt_text, &response.content);
                        self.governor.record_usage(tokens).await;
                        info!(request_id = dispatch.request_id, "Reply arrived after session ended");
                        Err(TurnError::Ended)
                    }
                }
            }
            Err(e) => {
                // A failed call does not count against the per-minute window
                self.governor.release_reservation().await;
                let message = e.user_message();
                let applied = self
                    .session
                    .lock()
                    .await
                    .receive_failure(dispatch.request_id, &message);

                if applied {
                    Err(TurnError::Provider { message })
                } else {
                    warn!(error = %e, "Provider failed after session ended");
                    Err(TurnError::Ended)
                }
            }
        }
    }

    /// Send the argument left over from a denied or failed turn
    pub async fn resend_draft(&self) -> Result<Exchange> {
        let draft = {
            let session = self.session.lock().await;
            if session.phase() == TurnPhase::Ended {
                return Err(TurnError::Ended);
            }
            session.state().draft.clone()
        };
        match draft {
            Some(draft) => self.submit_argument(&draft).await,
            None => Err(TurnError::NoPendingArgument),
        }
    }

    /// Copy of the conversation for rendering
    pub async fn snapshot(&self) -> ConversationState {
        self.session.lock().await.snapshot()
    }

    /// Remaining quota for display
    pub async fn quota_snapshot(&self) -> QuotaStatus {
        self.governor.status().await
    }

    /// Summary, once the session has ended
    pub async fn summary(&self) -> Option<SessionSummary> {
        self.session.lock().await.summary().cloned()
    }

    /// End the session and stop the countdown. Idempotent.
    pub async fn stop(&self) -> SessionSummary {
        let summary = self.session.lock().await.stop();
        self.cancel.cancel();
        summary
    }

    /// Spawn the one-second countdown.
    ///
    /// The task resolves to the summary when time runs out, or `None` when
    /// the session was stopped first.
    pub fn start_countdown(&self) -> JoinHandle<Option<SessionSummary>> {
        let session = Arc::clone(&self.session);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            // First tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Countdown cancelled");
                        return None;
                    }
                    _ = interval.tick() => {
                        let mut session = session.lock().await;
                        if session.phase() == TurnPhase::Ended {
                            cancel.cancel();
                            return None;
                        }
                        if let Some(summary) = session.tick() {
                            cancel.cancel();
                            return Some(summary);
                        }
                    }
                }
            }
        })
    }
}
