//! Gemini - Google Gemini API provider
//!
//! This module implements the Google Gemini provider using reqwest.

mod config;
mod provider;
mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use config::{GeminiConfig, DEFAULT_MODEL, MODELS};
pub use provider::GeminiProvider;
