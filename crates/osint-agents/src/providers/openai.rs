use async_trait::async_trait;
use osint_models::ProviderId;
use serde_json::{json, Map, Value};

use super::chat::{base_body, post_chat};
use crate::adapter::{Completion, CompletionBackend, CompletionRequest};
use crate::client::ProviderClient;
use crate::error::ProviderError;

/// Reasoning models take an effort level instead of a token budget.
fn is_reasoning_model(model_id: &str) -> bool {
    ["o1", "o3", "o4"]
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
}

fn reasoning_effort(thinking_budget: u32) -> &'static str {
    match thinking_budget {
        0..=2048 => "low",
        2049..=8192 => "medium",
        _ => "high",
    }
}

fn request_body(request: &CompletionRequest) -> Map<String, Value> {
    let mut body = base_body(request);
    if is_reasoning_model(&request.model_id) && request.thinking_budget > 0 {
        body.insert(
            "reasoning_effort".to_string(),
            json!(reasoning_effort(request.thinking_budget)),
        );
    }
    // Only the search-preview models accept web search on this endpoint.
    if request.web_search && request.model_id.contains("search-preview") {
        body.insert("web_search_options".to_string(), json!({}));
    }
    body
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiBackend;

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn complete(
        &self,
        client: &ProviderClient,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let headers = [("Authorization", format!("Bearer {}", client.api_key))];
        post_chat(client, &headers, request_body(request), request.operation).await
    }
}
