//! Status and body handling shared by the HTTP providers.

use osint_models::{Operation, ProviderId};
use serde_json::Value;

use crate::error::{code_for_message, ErrorCode, ProviderError};
use crate::transport::HttpReply;

const SNIPPET_LEN: usize = 200;

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Error code implied by an HTTP status, when the status alone decides it.
fn code_for_status(status: u16) -> Option<ErrorCode> {
    match status {
        429 => Some(ErrorCode::RateLimited),
        _ => None,
    }
}

/// The `error.message` of a JSON error body, or a bare string `error`.
fn upstream_error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Turn a raw reply into a JSON body, or a classified error.
pub fn decode_reply(
    reply: &HttpReply,
    provider: ProviderId,
    operation: Operation,
) -> Result<Value, ProviderError> {
    let parsed = serde_json::from_str::<Value>(&reply.body);

    if reply.is_success() {
        return parsed.map_err(|err| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                provider,
                operation,
                format!(
                    "HTTP {} with a non-JSON body: {}",
                    reply.status,
                    snippet(&reply.body)
                ),
            )
            .with_status(reply.status)
            .with_cause(err)
        });
    }

    let message = match parsed.as_ref().ok().and_then(upstream_error_message) {
        Some(upstream) => format!("HTTP {}: {upstream}", reply.status),
        None => format!("HTTP {}: {}", reply.status, snippet(&reply.body)),
    };
    let code = code_for_status(reply.status).unwrap_or_else(|| match code_for_message(&message) {
        // A message that merely mentions a credential marker is still an upstream failure.
        ErrorCode::MissingApiKey | ErrorCode::UnsupportedOperation => ErrorCode::UpstreamError,
        other => other,
    });
    Err(ProviderError::new(code, provider, operation, message).with_status(reply.status))
}
