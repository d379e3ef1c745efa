//! Credential resolution: persisted key first, then the process environment.

use std::sync::Arc;

use osint_models::{Operation, ProviderId};
use osint_store::CredentialStore;
use tracing::{debug, warn};

use crate::error::{ErrorCode, ProviderError};

/// Looks up an environment variable. Swappable so tests never touch the real env.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

const MIN_KEY_LEN: usize = 20;

pub fn key_prefix(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => "AIza",
        ProviderId::OpenAi => "sk-",
        ProviderId::Anthropic => "sk-ant-",
        ProviderId::OpenRouter => "sk-or-",
    }
}

/// Environment variables consulted, in order.
pub fn env_vars(provider: ProviderId) -> &'static [&'static str] {
    match provider {
        ProviderId::Gemini => &["GEMINI_API_KEY", "API_KEY"],
        ProviderId::OpenAi => &["OPENAI_API_KEY"],
        ProviderId::Anthropic => &["ANTHROPIC_API_KEY"],
        ProviderId::OpenRouter => &["OPENROUTER_API_KEY"],
    }
}

/// Cheap plausibility check on a key's shape. It does not prove the key works.
pub fn is_valid_shape(provider: ProviderId, key: &str) -> bool {
    key.starts_with(key_prefix(provider))
        && key.len() >= MIN_KEY_LEN
        && !key.chars().any(char::is_whitespace)
}

#[derive(Clone)]
pub struct KeyStore {
    store: Arc<dyn CredentialStore>,
    env: EnvLookup,
}

impl KeyStore {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::with_env(store, Arc::new(|name: &str| std::env::var(name).ok()))
    }

    pub fn with_env(store: Arc<dyn CredentialStore>, env: EnvLookup) -> Self {
        Self { store, env }
    }

    /// Resolve the key for `provider`, or fail with MISSING_API_KEY.
    ///
    /// A stored key that fails the shape check is still returned; the upstream
    /// has the final word on whether it is accepted.
    pub fn resolve(&self, provider: ProviderId, operation: Operation) -> Result<String, ProviderError> {
        let stored = match self.store.get(provider) {
            Ok(value) => value,
            Err(err) => {
                warn!(provider = %provider, error = %err, "credential store read failed");
                None
            }
        };

        let key = stored
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                env_vars(provider)
                    .iter()
                    .filter_map(|name| (self.env)(name))
                    .map(|k| k.trim().to_string())
                    .find(|k| !k.is_empty())
            });

        match key {
            Some(key) => {
                if !is_valid_shape(provider, &key) {
                    warn!(
                        provider = %provider,
                        expected_prefix = key_prefix(provider),
                        "credential does not look like a {provider} key"
                    );
                }
                debug!(provider = %provider, "credential resolved");
                Ok(key)
            }
            None => Err(ProviderError::new(
                ErrorCode::MissingApiKey,
                provider,
                operation,
                format!(
                    "no API key configured for {provider}; set one with `osint key set {provider} <key>` or {}",
                    env_vars(provider).join(" / ")
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osint_store::MemoryStore;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> EnvLookup {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |name: &str| map.get(name).cloned())
    }

    #[test]
    fn stored_key_wins_over_env() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(ProviderId::OpenAi, "sk-stored-0123456789abcdef")
            .unwrap();
        let keys = KeyStore::with_env(store, env_from(&[("OPENAI_API_KEY", "sk-env-0123456789abcdef")]));
        assert_eq!(
            keys.resolve(ProviderId::OpenAi, Operation::Investigate).unwrap(),
            "sk-stored-0123456789abcdef"
        );
    }

    #[test]
    fn falls_back_to_env_in_order() {
        let keys = KeyStore::with_env(
            Arc::new(MemoryStore::new()),
            env_from(&[("API_KEY", "AIzaFallbackKey0123456789")]),
        );
        assert_eq!(
            keys.resolve(ProviderId::Gemini, Operation::ScanAnomalies).unwrap(),
            "AIzaFallbackKey0123456789"
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let store = Arc::new(MemoryStore::new());
        store.set(ProviderId::Anthropic, "   ").unwrap();
        let keys = KeyStore::with_env(store, env_from(&[("ANTHROPIC_API_KEY", "")]));
        let err = keys
            .resolve(ProviderId::Anthropic, Operation::GetLiveIntel)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingApiKey);
        assert_eq!(err.provider(), ProviderId::Anthropic);
        assert!(err.message().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn shape_checks_prefix_length_and_whitespace() {
        assert!(is_valid_shape(ProviderId::Gemini, "AIzaSyA0123456789abcdefgh"));
        assert!(!is_valid_shape(ProviderId::Gemini, "sk-0123456789abcdefghij"));
        assert!(is_valid_shape(ProviderId::Anthropic, "sk-ant-api03-0123456789"));
        assert!(!is_valid_shape(ProviderId::OpenRouter, "sk-or-short"));
        assert!(!is_valid_shape(ProviderId::OpenAi, "sk-0123456789 abcdefghij"));
    }
}
