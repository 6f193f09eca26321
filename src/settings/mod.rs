//! Application configuration types
//!
//! Loaded by [`loader::load_config`] from `config/default.toml` and its
//! overrides.

pub mod loader;

use rostrum_llm::QuotaConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use loader::load_config;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// AI provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model override; empty keeps the provider default
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmSettings {
    /// Model override, if one is set
    pub fn model_override(&self) -> Option<&str> {
        let model = self.model.trim();
        (!model.is_empty()).then_some(model)
    }
}

/// Practice session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_minutes")]
    pub default_minutes: u32,
    #[serde(default = "default_fallback_score")]
    pub fallback_score: f64,
}

fn default_minutes() -> u32 {
    5
}

fn default_fallback_score() -> f64 {
    rostrum_core::scoring::FALLBACK_AVERAGE
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            fallback_score: default_fallback_score(),
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Data directory; empty means `~/.rostrum`
    #[serde(default)]
    pub data_dir: String,
}

impl StorageSettings {
    /// Resolved data directory, `None` for the default location
    pub fn data_dir(&self) -> Option<PathBuf> {
        let dir = self.data_dir.trim();
        if dir.is_empty() {
            return None;
        }
        match dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(dir)),
        }
    }
}
