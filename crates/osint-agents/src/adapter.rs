//! The uniform operation contract and the shared pipeline behind it:
//! prompt, transport under retry, extraction, normalization.

use async_trait::async_trait;
use chrono::Utc;
use osint_models::catalog::supports_structured_output;
use osint_models::{
    FeedItem, InvestigateRequest, InvestigationReport, LiveIntelRequest, MonitorEvent, Operation,
    ProviderId, ScanRequest, Source, SystemConfig,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::client::{ClientSlot, ProviderClient};
use crate::error::{ErrorCode, ProviderError};
use crate::extract::extract_json;
use crate::fallback;
use crate::normalize::{normalize_feed_items, normalize_monitor_events, normalize_report, ReportContext};
use crate::prompts;
use crate::retry::{CallContext, RetryPolicy};

/// One upstream provider. Mockable for router tests.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn investigate(
        &self,
        request: &InvestigateRequest,
        config: &SystemConfig,
    ) -> Result<InvestigationReport, ProviderError>;

    async fn scan_anomalies(
        &self,
        request: &ScanRequest,
        config: &SystemConfig,
    ) -> Result<Vec<FeedItem>, ProviderError>;

    async fn get_live_intel(
        &self,
        request: &LiveIntelRequest,
        config: &SystemConfig,
    ) -> Result<Vec<MonitorEvent>, ProviderError>;

    /// Base64 audio of `text` read aloud.
    async fn generate_audio_briefing(
        &self,
        _text: &str,
        _config: &SystemConfig,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::unsupported(
            self.provider(),
            Operation::GenerateAudioBriefing,
        ))
    }

    /// Drop any cached client state.
    fn reset(&self) {}
}

/// A single model call as the pipeline sees it, before wire encoding.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub operation: Operation,
    pub model_id: String,
    pub system: String,
    pub prompt: String,
    /// Native output schema, for backends that can enforce one.
    pub schema: Option<Value>,
    /// Textual fallback for the schema.
    pub json_instruction: Option<String>,
    /// Whether the model can honor `schema`; when false the instruction must be sent.
    pub structured_output: bool,
    pub thinking_budget: u32,
    pub web_search: bool,
}

impl CompletionRequest {
    /// The user prompt with the textual JSON instruction appended.
    pub fn prompt_with_instruction(&self) -> String {
        match &self.json_instruction {
            Some(instruction) => format!("{}\n\n{instruction}", self.prompt),
            None => self.prompt.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Transport-native citations such as grounding chunks or url annotations.
    pub citations: Vec<Source>,
    pub finish_reason: Option<String>,
}

/// Wire-specific half of an adapter.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn complete(
        &self,
        client: &ProviderClient,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError>;

    fn supports_speech(&self) -> bool {
        false
    }

    async fn synthesize_speech(
        &self,
        _client: &ProviderClient,
        _text: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::unsupported(
            self.provider(),
            Operation::GenerateAudioBriefing,
        ))
    }
}

/// Adapter built from a wire backend plus the shared pipeline.
pub struct LlmAdapter<B> {
    backend: B,
    slot: ClientSlot,
    retry: RetryPolicy,
}

impl<B: CompletionBackend> LlmAdapter<B> {
    pub fn new(backend: B, slot: ClientSlot, retry: RetryPolicy) -> Self {
        Self {
            backend,
            slot,
            retry,
        }
    }

    fn completion_request(
        &self,
        operation: Operation,
        config: &SystemConfig,
        system: String,
        prompt: String,
    ) -> CompletionRequest {
        CompletionRequest {
            operation,
            model_id: config.model_id.clone(),
            system,
            prompt,
            schema: prompts::response_schema(operation),
            json_instruction: prompts::json_instruction(operation),
            structured_output: supports_structured_output(&config.model_id),
            thinking_budget: config.thinking_budget,
            web_search: true,
        }
    }

    async fn call(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let ctx = CallContext {
            provider: self.backend.provider(),
            model_id: request.model_id.clone(),
            operation: request.operation,
        };
        let this = self;
        self.retry
            .run(&ctx, move |_| async move {
                let client = this.slot.get(request.operation)?;
                this.backend.complete(&client, request).await
            })
            .await
    }

    /// Call the upstream and parse its text as JSON. Parse failures are final.
    async fn call_json(&self, request: &CompletionRequest) -> Result<(Value, Completion), ProviderError> {
        let completion = self.call(request).await?;
        let value = extract_json(&completion.text).map_err(|err| {
            ProviderError::new(
                ErrorCode::ParseError,
                self.backend.provider(),
                request.operation,
                err.to_string(),
            )
            .with_cause(err)
        })?;
        Ok((value, completion))
    }

    async fn try_scan(
        &self,
        request: &ScanRequest,
        config: &SystemConfig,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        let scope = request.scope();
        let prompt = prompts::scan_prompt(
            &request.region,
            &request.category,
            request.effective_date_range().as_ref(),
            &request.options,
        );
        let call = self.completion_request(
            Operation::ScanAnomalies,
            config,
            prompts::system_prompt(config, &scope),
            prompt,
        );
        let (value, _) = self.call_json(&call).await?;
        let mut items = normalize_feed_items(&value, &request.category, Utc::now());
        items.truncate(request.options.limit);
        Ok(items)
    }

    async fn try_live_intel(
        &self,
        request: &LiveIntelRequest,
        config: &SystemConfig,
    ) -> Result<Vec<MonitorEvent>, ProviderError> {
        let scope = request.scope();
        let prompt =
            prompts::live_intel_prompt(&request.topic, &request.monitor(), &request.existing_content);
        let call = self.completion_request(
            Operation::GetLiveIntel,
            config,
            prompts::system_prompt(config, &scope),
            prompt,
        );
        let (value, completion) = self.call_json(&call).await?;
        let mut events = normalize_monitor_events(&value, Utc::now());
        // Events without their own link borrow a citation in order.
        let mut spare = completion.citations.into_iter();
        for event in events.iter_mut().filter(|e| e.url.is_none()) {
            match spare.next() {
                Some(source) => event.url = Some(source.url),
                None => break,
            }
        }
        Ok(events)
    }
}

/// Errors that must reach the caller even where degraded results are allowed.
fn bypasses_fallback(err: &ProviderError) -> bool {
    err.code().requires_user_action()
}

#[async_trait]
impl<B: CompletionBackend> ProviderAdapter for LlmAdapter<B> {
    fn provider(&self) -> ProviderId {
        self.backend.provider()
    }

    async fn investigate(
        &self,
        request: &InvestigateRequest,
        config: &SystemConfig,
    ) -> Result<InvestigationReport, ProviderError> {
        let now = Utc::now();
        let scope = request.scope();
        let date_str = request
            .date_override
            .clone()
            .unwrap_or_else(|| prompts::format_report_date(now.date_naive()));
        let prompt = prompts::investigation_prompt(&request.topic, request.parent.as_ref(), &date_str);
        let call = self.completion_request(
            Operation::Investigate,
            config,
            prompts::system_prompt(config, &scope),
            prompt,
        );

        let (value, completion) = self.call_json(&call).await?;
        let report = normalize_report(
            &value,
            ReportContext {
                topic: request.topic.clone(),
                parent_topic: request.parent.as_ref().map(|p| p.topic.clone()),
                date_str,
                raw_text: completion.text,
                config: config.snapshot(),
                citations: completion.citations,
                now,
            },
        );
        info!(
            provider = %self.provider(),
            topic = %report.topic,
            entities = report.entities.len(),
            sources = report.sources.len(),
            "investigation complete"
        );
        Ok(report)
    }

    async fn scan_anomalies(
        &self,
        request: &ScanRequest,
        config: &SystemConfig,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        match self.try_scan(request, config).await {
            Ok(items) => {
                info!(provider = %self.provider(), items = items.len(), "anomaly scan complete");
                Ok(items)
            }
            Err(err) if bypasses_fallback(&err) => Err(err),
            Err(err) => {
                warn!(
                    provider = %self.provider(),
                    code = %err.code(),
                    error = %err,
                    "anomaly scan failed, serving fallback items"
                );
                Ok(fallback::feed_items(&request.category, Utc::now()))
            }
        }
    }

    async fn get_live_intel(
        &self,
        request: &LiveIntelRequest,
        config: &SystemConfig,
    ) -> Result<Vec<MonitorEvent>, ProviderError> {
        match self.try_live_intel(request, config).await {
            Ok(events) => {
                info!(provider = %self.provider(), events = events.len(), "live intel complete");
                Ok(events)
            }
            Err(err) if bypasses_fallback(&err) => Err(err),
            Err(err) => {
                warn!(
                    provider = %self.provider(),
                    code = %err.code(),
                    error = %err,
                    "live intel failed, serving fallback events"
                );
                Ok(fallback::monitor_events(&request.topic, Utc::now()))
            }
        }
    }

    async fn generate_audio_briefing(
        &self,
        text: &str,
        config: &SystemConfig,
    ) -> Result<String, ProviderError> {
        let provider = self.provider();
        if !self.backend.supports_speech() {
            return Err(ProviderError::unsupported(
                provider,
                Operation::GenerateAudioBriefing,
            ));
        }
        let ctx = CallContext {
            provider,
            model_id: config.model_id.clone(),
            operation: Operation::GenerateAudioBriefing,
        };
        let this = self;
        self.retry
            .run(&ctx, move |_| async move {
                let client = this.slot.get(Operation::GenerateAudioBriefing)?;
                this.backend.synthesize_speech(&client, text).await
            })
            .await
    }

    fn reset(&self) {
        self.slot.reset();
    }
}
