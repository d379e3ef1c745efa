use async_trait::async_trait;
use osint_models::ProviderId;
use serde_json::{json, Map, Value};

use super::chat::{base_body, post_chat};
use crate::adapter::{Completion, CompletionBackend, CompletionRequest};
use crate::client::ProviderClient;
use crate::error::ProviderError;

pub const APP_REFERER: &str = "https://github.com/osint-investigation-assistant";
pub const APP_TITLE: &str = "OSINT Investigation Assistant";

fn request_body(request: &CompletionRequest) -> Map<String, Value> {
    let mut body = base_body(request);
    if request.thinking_budget > 0 {
        body.insert(
            "reasoning".to_string(),
            json!({"max_tokens": request.thinking_budget}),
        );
    }
    if request.web_search {
        body.insert("plugins".to_string(), json!([{"id": "web"}]));
    }
    body
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenRouterBackend;

#[async_trait]
impl CompletionBackend for OpenRouterBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenRouter
    }

    async fn complete(
        &self,
        client: &ProviderClient,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let headers = [
            ("Authorization", format!("Bearer {}", client.api_key)),
            ("HTTP-Referer", APP_REFERER.to_string()),
            ("X-Title", APP_TITLE.to_string()),
        ];
        post_chat(client, &headers, request_body(request), request.operation).await
    }
}
