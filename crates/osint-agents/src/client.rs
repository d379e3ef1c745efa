//! Lazily created per-provider client.

use std::sync::{Arc, Mutex};

use osint_models::{Operation, ProviderId};

use crate::error::{ErrorCode, ProviderError};
use crate::keys::KeyStore;
use crate::transport::HttpTransport;

/// Everything needed to call one upstream. Read-only once built.
pub struct ProviderClient {
    pub provider: ProviderId,
    pub api_key: String,
    pub base_url: String,
    pub transport: Arc<dyn HttpTransport>,
}

impl ProviderClient {
    /// `{base_url}/{path}` without doubled slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Holds the provider's client once the first call has resolved a credential.
/// A missing key leaves the slot empty so a later call can pick up a new key.
pub struct ClientSlot {
    provider: ProviderId,
    base_url: String,
    keys: KeyStore,
    transport: Arc<dyn HttpTransport>,
    client: Mutex<Option<Arc<ProviderClient>>>,
}

impl ClientSlot {
    pub fn new(
        provider: ProviderId,
        base_url: impl Into<String>,
        keys: KeyStore,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            keys,
            transport,
            client: Mutex::new(None),
        }
    }

    pub fn get(&self, operation: Operation) -> Result<Arc<ProviderClient>, ProviderError> {
        let mut guard = self.client.lock().map_err(|_| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                self.provider,
                operation,
                "client slot lock poisoned",
            )
        })?;
        if let Some(client) = guard.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(ProviderClient {
            provider: self.provider,
            api_key: self.keys.resolve(self.provider, operation)?,
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
        });
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    pub fn is_initialized(&self) -> bool {
        self.client.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Drop the cached client; the next call resolves the credential again.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.client.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scripted, OPENAI_KEY};
    use osint_store::{CredentialStore, MemoryStore};

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = ProviderClient {
            provider: ProviderId::OpenAi,
            api_key: OPENAI_KEY.to_string(),
            base_url: "https://api.openai.com/v1/".to_string(),
            transport: scripted(),
        };
        assert_eq!(
            client.endpoint("/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn slot_initializes_once_and_resets() {
        let store = Arc::new(MemoryStore::new());
        let keys = KeyStore::with_env(store.clone(), Arc::new(|_: &str| None));
        let slot = ClientSlot::new(ProviderId::OpenAi, "https://api.openai.com/v1", keys, scripted());

        let err = slot.get(Operation::Investigate).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingApiKey);
        assert!(!slot.is_initialized());

        store.set(ProviderId::OpenAi, OPENAI_KEY).unwrap();
        let first = slot.get(Operation::Investigate).unwrap();
        let second = slot.get(Operation::ScanAnomalies).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        store.set(ProviderId::OpenAi, "sk-rotated-0123456789abcdef").unwrap();
        assert_eq!(slot.get(Operation::Investigate).unwrap().api_key, OPENAI_KEY);
        slot.reset();
        assert_eq!(
            slot.get(Operation::Investigate).unwrap().api_key,
            "sk-rotated-0123456789abcdef"
        );
    }
}
