//! Gemini provider implementation

use super::config::GeminiConfig;
use super::types::*;
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::util::redact_provider_message;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Retries for 5xx responses
const MAX_RETRIES: u32 = 2;

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    pub(crate) config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Send a request, retrying transient server errors.
    async fn send_request(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        for attempt in 0..=MAX_RETRIES {
            match self.send_request_once(model, request).await {
                Err(Error::ServerError(ref msg)) if attempt < MAX_RETRIES => {
                    let delay_secs = 2 + u64::from(attempt) * 3; // 2, 5
                    tracing::warn!(
                        attempt = attempt + 1,
                        model = %model,
                        delay_secs,
                        error = %msg,
                        "Gemini server error, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
                }
                other => return other,
            }
        }
        Err(Error::ServerError("retries exhausted".to_string()))
    }

    /// Single attempt to send request to Gemini API.
    async fn send_request_once(
        &self,
        model: &str,
        request: &GeminiRequest,
    ) -> Result<GeminiResponse> {
        // The URL carries the key; log the model only
        debug!("Sending request to Gemini model: {}", model);

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(redact_provider_message(&e.without_url().to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!(
                "{}: {}",
                e,
                crate::util::truncate_safe(&body, 200)
            ))
        })
    }
}

/// Build the wire request for a completion
pub(crate) fn build_request(request: &CompletionRequest, default_max_tokens: u32) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent::text(Some("user"), request.prompt.clone())],
        system_instruction: request
            .system
            .as_ref()
            .map(|s| GeminiContent::text(None, s.clone())),
        generation_config: Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens.or(Some(default_max_tokens)),
        }),
    }
}

/// Turn a wire response into a completion
pub(crate) fn parse_response(response: GeminiResponse, model: &str) -> Result<CompletionResponse> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| Error::InvalidResponse("No candidates in response".to_string()))?;

    let content: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        tracing::warn!(finish_reason = ?candidate.finish_reason, "Gemini returned empty content");
        return Err(Error::InvalidResponse(format!(
            "empty response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count,
    });

    Ok(CompletionResponse {
        content,
        usage,
        finish_reason: candidate.finish_reason.clone(),
        model: model.to_string(),
    })
}

/// Map a non-success HTTP response to an error
pub(crate) fn classify_error(status: StatusCode, body: &str) -> Error {
    tracing::warn!(status = %status, "Gemini API error response");

    if let Ok(error) = serde_json::from_str::<GeminiError>(body) {
        tracing::warn!(
            error_status = %error.error.status,
            error_code = error.error.code,
            "Gemini API error detail"
        );
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(secs) = error.error.retry_delay_secs() {
                tracing::warn!(retry_after_secs = secs, "Gemini asked to back off");
            }
            return Error::RateLimit;
        }
        let detail = format!("{}: {}", error.error.status, error.error.message);
        if status.is_server_error() {
            return Error::ServerError(redact_provider_message(&detail));
        }
        return Error::Api(redact_provider_message(&detail));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimit;
    }
    if status.is_server_error() {
        return Error::ServerError(redact_provider_message(&format!("HTTP {}", status)));
    }
    // SECURITY: Don't expose raw HTTP response body
    Error::Api(redact_provider_message(&format!("HTTP {}", status)))
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model.clone()
        };

        let gemini_request = build_request(&request, self.config.default_max_tokens);
        let response = self.send_request(&model, &gemini_request).await?;
        parse_response(response, &model)
    }
}
