//! Anthropic Messages API.

use async_trait::async_trait;
use osint_models::{Operation, ProviderId};
use serde_json::{json, Value};

use super::http::decode_reply;
use crate::adapter::{Completion, CompletionBackend, CompletionRequest};
use crate::client::ProviderClient;
use crate::error::{ErrorCode, ProviderError};

pub const API_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "messages";
const ANSWER_TOKENS: u32 = 8192;
/// Smallest thinking budget the API accepts.
const MIN_THINKING_BUDGET: u32 = 1024;

fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "model": request.model_id,
        "max_tokens": ANSWER_TOKENS,
        "system": request.system,
        "messages": [{"role": "user", "content": request.prompt_with_instruction()}]
    });
    if request.thinking_budget > 0 {
        let budget = request.thinking_budget.max(MIN_THINKING_BUDGET);
        body["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        body["max_tokens"] = json!(ANSWER_TOKENS.saturating_add(budget));
    }
    body
}

/// Text blocks joined, else the thinking blocks, plus the stop reason.
fn parse_messages_response(value: &Value) -> (String, Option<String>) {
    let blocks = value
        .get("content")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let collect = |kind: &str, field: &str| {
        blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some(kind))
            .filter_map(|b| b.get(field).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("")
    };
    let mut text = collect("text", "text");
    if text.trim().is_empty() {
        text = collect("thinking", "thinking");
    }
    let stop_reason = value
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    (text, stop_reason)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicBackend;

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn complete(
        &self,
        client: &ProviderClient,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let operation: Operation = request.operation;
        let headers = [
            ("x-api-key", client.api_key.clone()),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let reply = client
            .transport
            .post_json(&client.endpoint(MESSAGES_PATH), &headers, &request_body(request))
            .await
            .map_err(|err| {
                ProviderError::new(ErrorCode::UpstreamError, ProviderId::Anthropic, operation, err.to_string())
                    .with_cause(err)
            })?;
        let value = decode_reply(&reply, ProviderId::Anthropic, operation)?;
        let (text, stop_reason) = parse_messages_response(&value);
        if text.trim().is_empty() {
            return Err(ProviderError::new(
                ErrorCode::UpstreamError,
                ProviderId::Anthropic,
                operation,
                format!(
                    "empty response (finish reason: {})",
                    stop_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }
        Ok(Completion {
            text,
            citations: Vec::new(),
            finish_reason: stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(thinking_budget: u32) -> CompletionRequest {
        CompletionRequest {
            operation: Operation::Investigate,
            model_id: "claude-sonnet-4-20250514".to_string(),
            system: "sys".to_string(),
            prompt: "topic".to_string(),
            schema: None,
            json_instruction: Some("JSON".to_string()),
            structured_output: true,
            thinking_budget,
            web_search: true,
        }
    }

    #[test]
    fn thinking_budget_is_raised_to_minimum() {
        let body = request_body(&request(500));
        assert_eq!(body["thinking"]["budget_tokens"], 1024);
        assert_eq!(body["max_tokens"], 8192 + 1024);
        assert!(request_body(&request(0)).get("thinking").is_none());
    }

    #[test]
    fn huge_thinking_budget_saturates_max_tokens() {
        let body = request_body(&request(u32::MAX));
        assert_eq!(body["thinking"]["budget_tokens"], u32::MAX);
        assert_eq!(body["max_tokens"], u32::MAX);
    }

    #[test]
    fn text_blocks_win_over_thinking() {
        let (text, stop) = parse_messages_response(&json!({
            "content": [
                {"type": "thinking", "thinking": "let me see"},
                {"type": "text", "text": "{\"summary\":"},
                {"type": "text", "text": " \"ok\"}"}
            ],
            "stop_reason": "end_turn"
        }));
        assert_eq!(text, "{\"summary\": \"ok\"}");
        assert_eq!(stop.as_deref(), Some("end_turn"));
    }

    #[test]
    fn thinking_used_when_no_text() {
        let (text, stop) = parse_messages_response(&json!({
            "content": [{"type": "thinking", "thinking": "[]"}],
            "stop_reason": "max_tokens"
        }));
        assert_eq!(text, "[]");
        assert_eq!(stop.as_deref(), Some("max_tokens"));
    }
}
