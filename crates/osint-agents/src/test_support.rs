//! Test doubles shared by unit tests and the integration suites: a scripted
//! HTTP transport, canned provider bodies, and a recording adapter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use osint_models::{
    EventType, FeedItem, InvestigateRequest, InvestigationReport, LiveIntelRequest, MonitorEvent,
    Operation, ProviderId, RiskLevel, ScanRequest, Sentiment, SystemConfig, ThreatLevel,
};
use osint_store::{CredentialStore, MemoryStore};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::adapter::ProviderAdapter;
use crate::error::{ErrorCode, ProviderError};
use crate::keys::KeyStore;
use crate::retry::RetryPolicy;
use crate::transport::{HttpReply, HttpTransport, TransportError};

pub const GEMINI_KEY: &str = "AIzaSyTestKey0123456789abcdef";
pub const OPENAI_KEY: &str = "sk-test-0123456789abcdef";
pub const ANTHROPIC_KEY: &str = "sk-ant-REDACTED";
pub const OPENROUTER_KEY: &str = "sk-or-test-0123456789abcdef";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Replays queued replies in order, then `always` (if set), then HTTP 500.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<HttpReply>>,
    always: Option<HttpReply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = HttpReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn always(reply: HttpReply) -> Self {
        Self {
            always: Some(reply),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: HttpReply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        lock(&self.requests).push(RecordedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body: body.clone(),
        });
        let queued = lock(&self.replies).pop_front();
        Ok(queued
            .or_else(|| self.always.clone())
            .unwrap_or_else(|| reply(500, "no scripted reply")))
    }
}

/// An empty scripted transport as a trait object.
pub fn scripted() -> Arc<dyn HttpTransport> {
    Arc::new(ScriptedTransport::new())
}

pub fn reply(status: u16, body: impl Into<String>) -> HttpReply {
    HttpReply {
        status,
        body: body.into(),
    }
}

pub fn json_reply(status: u16, body: &Value) -> HttpReply {
    reply(status, body.to_string())
}

/// A `generateContent` response carrying `text` and optional grounding links.
pub fn gemini_body(text: &str, grounding: &[(&str, &str)]) -> Value {
    let chunks: Vec<Value> = grounding
        .iter()
        .map(|(title, uri)| json!({"web": {"title": title, "uri": uri}}))
        .collect();
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP",
            "groundingMetadata": {"groundingChunks": chunks}
        }]
    })
}

pub fn gemini_audio_body(data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": data}}]},
            "finishReason": "STOP"
        }]
    })
}

/// A `/chat/completions` response with `content` as the assistant message.
pub fn chat_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

pub fn anthropic_body(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    })
}

/// A credential store holding a valid-looking key for every provider.
pub fn store_with_all_keys() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (provider, key) in [
        (ProviderId::Gemini, GEMINI_KEY),
        (ProviderId::OpenAi, OPENAI_KEY),
        (ProviderId::Anthropic, ANTHROPIC_KEY),
        (ProviderId::OpenRouter, OPENROUTER_KEY),
    ] {
        if let Err(err) = store.set(provider, key) {
            tracing::warn!(error = %err, "could not seed test credential");
        }
    }
    store
}

/// A key store that ignores the real process environment.
pub fn isolated_keys(store: Arc<MemoryStore>) -> KeyStore {
    KeyStore::with_env(store, Arc::new(|_: &str| None))
}

/// Retry policy with the default budget but no waiting.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        retries: 3,
        delay: Duration::ZERO,
        attempt_timeout: None,
    }
}

/// One adapter call as seen by `RecordingAdapter`.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: Operation,
    pub config: SystemConfig,
    /// Scope id the adapter received, if the request carried one.
    pub scope_id: Option<String>,
}

/// Adapter that records calls and returns canned results, or a fixed error.
pub struct RecordingAdapter {
    provider: ProviderId,
    failure: Option<ErrorCode>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingAdapter {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: ProviderId, code: ErrorCode) -> Self {
        Self {
            failure: Some(code),
            ..Self::new(provider)
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    fn record(
        &self,
        operation: Operation,
        config: &SystemConfig,
        scope_id: Option<String>,
    ) -> Result<(), ProviderError> {
        lock(&self.calls).push(RecordedCall {
            operation,
            config: config.clone(),
            scope_id,
        });
        match self.failure {
            Some(code) => Err(ProviderError::new(code, self.provider, operation, "scripted failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for RecordingAdapter {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn investigate(
        &self,
        request: &InvestigateRequest,
        config: &SystemConfig,
    ) -> Result<InvestigationReport, ProviderError> {
        self.record(
            Operation::Investigate,
            config,
            request.scope.as_ref().map(|s| s.id.clone()),
        )?;
        Ok(InvestigationReport {
            id: Uuid::new_v4(),
            topic: request.topic.clone(),
            parent_topic: request.parent.as_ref().map(|p| p.topic.clone()),
            date_str: request.date_override.clone().unwrap_or_default(),
            summary: format!("Recorded investigation of {}", request.topic),
            entities: vec![],
            agendas: vec![],
            leads: vec![],
            sources: vec![],
            raw_text: String::new(),
            config: config.snapshot(),
            created_at: Utc::now(),
        })
    }

    async fn scan_anomalies(
        &self,
        request: &ScanRequest,
        config: &SystemConfig,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        self.record(
            Operation::ScanAnomalies,
            config,
            request.scope.as_ref().map(|s| s.id.clone()),
        )?;
        Ok(vec![FeedItem {
            id: "recorded-1".to_string(),
            title: format!("{} anomaly in {}", request.category, request.region),
            category: request.category.clone(),
            risk_level: RiskLevel::Medium,
            timestamp: Utc::now().to_rfc3339(),
        }])
    }

    async fn get_live_intel(
        &self,
        request: &LiveIntelRequest,
        config: &SystemConfig,
    ) -> Result<Vec<MonitorEvent>, ProviderError> {
        self.record(
            Operation::GetLiveIntel,
            config,
            request.scope.as_ref().map(|s| s.id.clone()),
        )?;
        let monitor = request.monitor();
        Ok(vec![MonitorEvent {
            id: "recorded-1".to_string(),
            kind: EventType::News,
            source_name: "Recorder".to_string(),
            content: format!("{} items requested on {}", monitor.total(), request.topic),
            timestamp: Utc::now().to_rfc3339(),
            sentiment: Sentiment::Neutral,
            threat_level: ThreatLevel::Info,
            url: None,
        }])
    }

    async fn generate_audio_briefing(
        &self,
        _text: &str,
        config: &SystemConfig,
    ) -> Result<String, ProviderError> {
        self.record(Operation::GenerateAudioBriefing, config, None)?;
        Ok("UklGRg==".to_string())
    }
}
