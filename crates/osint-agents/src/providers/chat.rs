//! OpenAI-style `/chat/completions`, shared by OpenAI and OpenRouter.

use osint_models::{Operation, ProviderId, Source};
use serde_json::{json, Map, Value};

use super::http::decode_reply;
use crate::adapter::{Completion, CompletionRequest};
use crate::client::ProviderClient;
use crate::error::{ErrorCode, ProviderError};
use crate::normalize::{dedupe_sources, normalize_source, to_display_text};

pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Base request body; callers add provider-specific fields.
pub fn base_body(request: &CompletionRequest) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("model".to_string(), json!(request.model_id));
    body.insert(
        "messages".to_string(),
        json!([
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.prompt_with_instruction()}
        ]),
    );
    body
}

pub async fn post_chat(
    client: &ProviderClient,
    headers: &[(&str, String)],
    body: Map<String, Value>,
    operation: Operation,
) -> Result<Completion, ProviderError> {
    let provider = client.provider;
    let reply = client
        .transport
        .post_json(&client.endpoint(CHAT_COMPLETIONS_PATH), headers, &Value::Object(body))
        .await
        .map_err(|err| {
            ProviderError::new(ErrorCode::UpstreamError, provider, operation, err.to_string())
                .with_cause(err)
        })?;
    let value = decode_reply(&reply, provider, operation)?;
    parse_chat_completion(&value, provider, operation)
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    let text = to_display_text(value?);
    (!text.trim().is_empty()).then_some(text)
}

/// Probe a chat completion for its answer: message content, then reasoning,
/// then refusal, then a bare `text` field.
pub fn parse_chat_completion(
    value: &Value,
    provider: ProviderId,
    operation: Operation,
) -> Result<Completion, ProviderError> {
    let choice = value.get("choices").and_then(|c| c.get(0));
    let message = choice.and_then(|c| c.get("message"));
    let field = |key: &str| message.and_then(|m| m.get(key));

    let text = non_empty_text(field("content"))
        .or_else(|| non_empty_text(field("reasoning")))
        .or_else(|| non_empty_text(field("reasoning_content")))
        .or_else(|| non_empty_text(field("refusal")))
        .or_else(|| non_empty_text(choice.and_then(|c| c.get("text"))))
        .or_else(|| non_empty_text(value.get("text")));

    let finish_reason = choice
        .and_then(|c| c.get("finish_reason"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(text) = text else {
        return Err(ProviderError::new(
            ErrorCode::UpstreamError,
            provider,
            operation,
            format!(
                "empty response (finish reason: {})",
                finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    };

    Ok(Completion {
        text,
        citations: citations(value, message),
        finish_reason,
    })
}

/// `url_citation` annotations on the message plus any top-level `citations` list.
fn citations(value: &Value, message: Option<&Value>) -> Vec<Source> {
    let annotations = message
        .and_then(|m| m.get("annotations"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|a| a.get("type").and_then(Value::as_str) == Some("url_citation"))
        .filter_map(|a| a.get("url_citation"))
        .filter_map(normalize_source);
    let top_level = value
        .get("citations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(normalize_source);
    dedupe_sources(annotations.chain(top_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: Value) -> Result<Completion, ProviderError> {
        parse_chat_completion(&value, ProviderId::OpenRouter, Operation::Investigate)
    }

    #[test]
    fn content_is_preferred() {
        let completion = parse(json!({
            "choices": [{"message": {"content": "{\"summary\": \"x\"}", "reasoning": "hmm"},
                         "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(completion.text, "{\"summary\": \"x\"}");
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn falls_through_reasoning_refusal_and_text() {
        let reasoning = parse(json!({
            "choices": [{"message": {"content": "", "reasoning": "answer in reasoning"}}]
        }))
        .unwrap();
        assert_eq!(reasoning.text, "answer in reasoning");

        let refusal = parse(json!({
            "choices": [{"message": {"content": null, "refusal": "I can't help with that"}}]
        }))
        .unwrap();
        assert_eq!(refusal.text, "I can't help with that");

        let legacy = parse(json!({"choices": [{"text": "completion text"}]})).unwrap();
        assert_eq!(legacy.text, "completion text");

        let bare = parse(json!({"text": "raw"})).unwrap();
        assert_eq!(bare.text, "raw");
    }

    #[test]
    fn content_parts_are_flattened() {
        let completion = parse(json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "[1,"}, {"type": "text", "text": "2]"}]}}]
        }))
        .unwrap();
        assert_eq!(completion.text, "[1, 2]");
    }

    #[test]
    fn empty_answer_reports_finish_reason() {
        let err = parse(json!({
            "choices": [{"message": {"content": ""}, "finish_reason": "length"}]
        }))
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UpstreamError);
        assert!(err.message().contains("length"));
    }

    #[test]
    fn citations_from_annotations_and_top_level() {
        let completion = parse(json!({
            "choices": [{"message": {
                "content": "{}",
                "annotations": [
                    {"type": "url_citation", "url_citation": {"url": "https://news.example/a", "title": "A"}},
                    {"type": "file_citation", "file_citation": {}}
                ]
            }}],
            "citations": ["https://news.example/A", "https://gov.example/b"]
        }))
        .unwrap();
        let urls: Vec<_> = completion.citations.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://news.example/a", "https://gov.example/b"]);
        assert_eq!(completion.citations[0].title, "A");
    }
}
