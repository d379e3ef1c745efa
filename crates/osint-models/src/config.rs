use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{default_model, provider_for_model, remap_legacy_model};
use crate::provider::ProviderId;
use crate::report::ConfigSnapshot;

pub const DEFAULT_PERSONA: &str = "Investigative journalist";

/// How exhaustive an investigation should be.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchDepth::Quick => "quick",
            SearchDepth::Standard => "standard",
            SearchDepth::Deep => "deep",
        })
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quick" => Ok(SearchDepth::Quick),
            "standard" => Ok(SearchDepth::Standard),
            "deep" => Ok(SearchDepth::Deep),
            other => Err(format!("unknown search depth: {other}")),
        }
    }
}

/// User-facing pipeline configuration, persisted by the config store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfig {
    pub provider: ProviderId,
    pub model_id: String,
    pub persona: String,
    pub search_depth: SearchDepth,
    /// Reasoning token budget; 0 disables provider-side thinking.
    pub thinking_budget: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            provider: ProviderId::Gemini,
            model_id: default_model(ProviderId::Gemini).to_string(),
            persona: DEFAULT_PERSONA.to_string(),
            search_depth: SearchDepth::Standard,
            thinking_budget: 0,
        }
    }
}

impl SystemConfig {
    /// Apply the legacy model remap and make the provider agree with the model id.
    ///
    /// The model id is ground truth: when it implies a provider, that provider
    /// replaces whatever was stored. Unrecognised ids keep the stored provider.
    pub fn normalized(mut self) -> Self {
        let mut model_id = remap_legacy_model(&self.model_id);
        if model_id.is_empty() {
            model_id = default_model(self.provider).to_string();
        }
        if let Some(provider) = provider_for_model(&model_id) {
            self.provider = provider;
        }
        self.model_id = model_id;

        let persona = self.persona.trim();
        self.persona = if persona.is_empty() {
            DEFAULT_PERSONA.to_string()
        } else {
            persona.to_string()
        };
        self
    }

    /// Shallow-merge a partial override, then normalize the result.
    pub fn with_override(&self, partial: &ConfigOverride) -> Self {
        let mut merged = self.clone();
        if let Some(provider) = partial.provider {
            merged.provider = provider;
        }
        if let Some(model_id) = &partial.model_id {
            merged.model_id = model_id.clone();
        }
        if let Some(persona) = &partial.persona {
            merged.persona = persona.clone();
        }
        if let Some(depth) = partial.search_depth {
            merged.search_depth = depth;
        }
        if let Some(budget) = partial.thinking_budget {
            merged.thinking_budget = budget;
        }
        merged.normalized()
    }

    /// The fields recorded on every report produced under this configuration.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            provider: self.provider,
            model_id: self.model_id.clone(),
            persona: self.persona.clone(),
            search_depth: self.search_depth,
            thinking_budget: self.thinking_budget,
        }
    }
}

/// A partial `SystemConfig`; `None` fields leave the base value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_depth: Option<SearchDepth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

impl ConfigOverride {
    pub fn model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ConfigOverride::default()
    }
}

/// Top-level application configuration, loaded from TOML by the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OsintConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the local SQLite database holding settings, credentials and results.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// Retry budget shared by every provider call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Fixed wait between attempts.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Upper bound on a single attempt. Absent disables the bound.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            delay_ms: default_delay_ms(),
            attempt_timeout_seconds: default_attempt_timeout(),
        }
    }
}

/// Base URLs for each provider's REST API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointsConfig {
    #[serde(default = "default_gemini_url")]
    pub gemini: String,
    #[serde(default = "default_openai_url")]
    pub openai: String,
    #[serde(default = "default_anthropic_url")]
    pub anthropic: String,
    #[serde(default = "default_openrouter_url")]
    pub openrouter: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            gemini: default_gemini_url(),
            openai: default_openai_url(),
            anthropic: default_anthropic_url(),
            openrouter: default_openrouter_url(),
        }
    }
}

impl EndpointsConfig {
    pub fn base_url(&self, provider: ProviderId) -> &str {
        match provider {
            ProviderId::Gemini => &self.gemini,
            ProviderId::OpenAi => &self.openai,
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::OpenRouter => &self.openrouter,
        }
    }
}

fn default_sqlite_path() -> String {
    "data/osint.db".to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_attempt_timeout() -> Option<u64> {
    Some(90)
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_system_config() {
        let config = SystemConfig {
            provider: ProviderId::Anthropic,
            model_id: "claude-3-5-haiku-latest".to_string(),
            persona: "Compliance officer".to_string(),
            search_depth: SearchDepth::Deep,
            thinking_budget: 2048,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"modelId\""));
        let deserialized: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn normalize_remaps_legacy_model_and_fixes_provider() {
        let stored = SystemConfig {
            provider: ProviderId::OpenAi,
            model_id: "gemini-1.5-pro".to_string(),
            ..SystemConfig::default()
        };
        let config = stored.normalized();
        assert_eq!(config.model_id, "gemini-2.5-pro");
        assert_eq!(config.provider, ProviderId::Gemini);
    }

    #[test]
    fn normalize_fills_empty_model_and_persona() {
        let config = SystemConfig {
            provider: ProviderId::OpenRouter,
            model_id: "  ".to_string(),
            persona: String::new(),
            ..SystemConfig::default()
        }
        .normalized();
        assert_eq!(config.model_id, "deepseek/deepseek-r1");
        assert_eq!(config.provider, ProviderId::OpenRouter);
        assert_eq!(config.persona, DEFAULT_PERSONA);
    }

    #[test]
    fn normalize_keeps_provider_for_unknown_model() {
        let config = SystemConfig {
            provider: ProviderId::Anthropic,
            model_id: "house-model".to_string(),
            ..SystemConfig::default()
        }
        .normalized();
        assert_eq!(config.provider, ProviderId::Anthropic);
    }

    #[test]
    fn override_model_wins_over_override_provider() {
        let base = SystemConfig::default();
        let merged = base.with_override(&ConfigOverride {
            provider: Some(ProviderId::Anthropic),
            model_id: Some("gpt-4o".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.provider, ProviderId::OpenAi);
        assert_eq!(merged.model_id, "gpt-4o");
        assert_eq!(merged.persona, base.persona);
    }

    #[test]
    fn empty_override_is_identity() {
        let base = SystemConfig::default();
        assert!(ConfigOverride::default().is_empty());
        assert_eq!(base.with_override(&ConfigOverride::default()), base);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/osint-test.db"

[retry]
retries = 1
delay_ms = 250

[endpoints]
openai = "http://localhost:8080/v1"
"#;

        let config: OsintConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.sqlite_path, "/tmp/osint-test.db");
        assert_eq!(config.retry.retries, 1);
        assert_eq!(config.retry.attempt_timeout_seconds, Some(90));
        assert_eq!(config.endpoints.openai, "http://localhost:8080/v1");
        assert_eq!(
            config.endpoints.base_url(ProviderId::Gemini),
            "https://generativelanguage.googleapis.com/v1beta"
        );
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: OsintConfig = toml::from_str("").unwrap();
        assert_eq!(config, OsintConfig::default());
        assert_eq!(config.retry.retries, 3);
        assert_eq!(config.retry.delay_ms, 2000);
    }
}
