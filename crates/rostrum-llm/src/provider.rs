//! LLM Provider trait definition
//!
//! Every outbound AI call goes through this trait so the quota governor
//! and the debate controller never depend on a concrete vendor.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Generate text for a single prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
