//! Wire-specific backends for each supported upstream.

pub mod anthropic;
pub mod chat;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod openrouter;

use std::sync::Arc;

use osint_models::{EndpointsConfig, ProviderId};

use crate::adapter::{CompletionBackend, LlmAdapter, ProviderAdapter};
use crate::client::ClientSlot;
use crate::keys::KeyStore;
use crate::retry::RetryPolicy;
use crate::transport::HttpTransport;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;
pub use openrouter::OpenRouterBackend;

/// One adapter per provider, all sharing the transport and key store.
pub fn default_adapters(
    keys: &KeyStore,
    transport: Arc<dyn HttpTransport>,
    endpoints: &EndpointsConfig,
    retry: &RetryPolicy,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let slot = |provider: ProviderId| {
        ClientSlot::new(
            provider,
            endpoints.base_url(provider),
            keys.clone(),
            Arc::clone(&transport),
        )
    };
    vec![
        adapter(GeminiBackend, slot(ProviderId::Gemini), retry),
        adapter(OpenAiBackend, slot(ProviderId::OpenAi), retry),
        adapter(AnthropicBackend, slot(ProviderId::Anthropic), retry),
        adapter(OpenRouterBackend, slot(ProviderId::OpenRouter), retry),
    ]
}

fn adapter<B: CompletionBackend + 'static>(
    backend: B,
    slot: ClientSlot,
    retry: &RetryPolicy,
) -> Arc<dyn ProviderAdapter> {
    Arc::new(LlmAdapter::new(backend, slot, retry.clone()))
}
