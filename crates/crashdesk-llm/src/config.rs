//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMConfigResponse, LLMConfigUpdate, LLMProvider};
use crashdesk_core::{Error, Result};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Backoff schedule for transient model failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: u32,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 2_000,
            backoff_factor: 2,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_factor.max(1));
        let mut delay = self.initial_delay_ms;
        for _ in 1..attempt {
            delay = delay.saturating_mul(factor);
            if delay >= self.max_delay_ms {
                break;
            }
        }
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Stored LLM configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Any OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.into()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            retry: RetryPolicy::default(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring LLM config {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for API keys
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = non_empty_env("ANTHROPIC_API_KEY");
        }
        if config.openai_api_key.is_none() {
            config.openai_api_key = non_empty_env("OPENAI_API_KEY");
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Apply an update, merging with existing config.
    pub fn apply_update(&mut self, update: &LLMConfigUpdate) -> Result<()> {
        if let Some(p) = &update.preferred_provider {
            if !matches!(p.as_str(), "auto" | "anthropic" | "openai") {
                return Err(Error::Config(format!("unknown provider: {}", p)));
            }
            self.preferred_provider = p.clone();
        }
        if let Some(k) = &update.anthropic_api_key {
            self.anthropic_api_key = Some(k.clone()).filter(|k| !k.is_empty());
        }
        if let Some(k) = &update.openai_api_key {
            self.openai_api_key = Some(k.clone()).filter(|k| !k.is_empty());
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(u) = &update.openai_base_url {
            self.openai_base_url = u.trim_end_matches('/').to_string();
        }
        Ok(())
    }

    /// Resolve which provider and model to use, with its key.
    pub fn resolve_provider(&self) -> Option<(LLMProvider, String, String)> {
        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "anthropic" => self
                    .anthropic_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone())),
                "openai" => self
                    .openai_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::OpenAI, self.openai_model.clone(), k.clone())),
                _ => None,
            };
        }

        // Auto mode: Anthropic > OpenAI
        if let Some(k) = &self.anthropic_api_key {
            return Some((LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone()));
        }
        if let Some(k) = &self.openai_api_key {
            return Some((LLMProvider::OpenAI, self.openai_model.clone(), k.clone()));
        }

        None
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        let resolved = self.resolve_provider();
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_model: self.anthropic_model.clone(),
            openai_model: self.openai_model.clone(),
            openai_base_url: self.openai_base_url.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            active_provider: resolved.map(|(p, _, _)| p.to_string()),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_retry_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(16));
        assert_eq!(policy.delay_after(5), Duration::from_secs(30));
        assert_eq!(policy.delay_after(60), Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_provider() {
        let mut config = LLMConfig::default();
        assert!(config.resolve_provider().is_none());

        config.openai_api_key = Some("sk-o".into());
        let (provider, model, _) = config.resolve_provider().unwrap();
        assert_eq!(provider, LLMProvider::OpenAI);
        assert_eq!(model, DEFAULT_OPENAI_MODEL);

        config.anthropic_api_key = Some("sk-a".into());
        assert_eq!(config.resolve_provider().unwrap().0, LLMProvider::Anthropic);

        config.preferred_provider = "openai".into();
        assert_eq!(config.resolve_provider().unwrap().0, LLMProvider::OpenAI);

        config.openai_api_key = None;
        assert!(config.resolve_provider().is_none());
    }

    #[test]
    fn test_apply_update() {
        let mut config = LLMConfig::default();
        config
            .apply_update(&LLMConfigUpdate {
                preferred_provider: Some("anthropic".into()),
                anthropic_api_key: Some("sk-a".into()),
                openai_base_url: Some("http://localhost:1234/v1/".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.preferred_provider, "anthropic");
        assert_eq!(config.openai_base_url, "http://localhost:1234/v1");

        let response = config.to_response();
        assert!(response.anthropic_configured);
        assert_eq!(response.active_provider.as_deref(), Some("anthropic"));

        let err = config.apply_update(&LLMConfigUpdate {
            preferred_provider: Some("groq".into()),
            ..Default::default()
        });
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("llm-config.json");
        let mut config = LLMConfig::load(&path);
        config.anthropic_model = "claude-test".into();
        config.retry.max_attempts = 2;
        config.save().unwrap();

        let loaded = LLMConfig::load(&path);
        assert_eq!(loaded.anthropic_model, "claude-test");
        assert_eq!(loaded.retry.max_attempts, 2);
        assert_eq!(loaded.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(&path, r#"{"preferred_provider": "openai"}"#).unwrap();
        let config = LLMConfig::load(&path);
        assert_eq!(config.preferred_provider, "openai");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.retry, RetryPolicy::default());
    }
}
