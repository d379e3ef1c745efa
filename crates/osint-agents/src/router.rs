//! Resolves the effective configuration for a call and hands it to the
//! adapter for the model's provider.

use std::collections::HashMap;
use std::sync::Arc;

use osint_models::catalog::provider_for_model;
use osint_models::{
    ConfigOverride, FeedItem, InvestigateRequest, InvestigationReport, InvestigationScope,
    LiveIntelRequest, MonitorEvent, Operation, ProviderId, ScanRequest, SystemConfig,
};
use osint_store::ConfigStore;
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::error::{ErrorCode, ProviderError};

/// Which operations each provider can serve. Only speech is gated.
pub fn supports(provider: ProviderId, operation: Operation) -> bool {
    match operation {
        Operation::GenerateAudioBriefing => provider == ProviderId::Gemini,
        Operation::Investigate | Operation::ScanAnomalies | Operation::GetLiveIntel => true,
    }
}

#[derive(Debug, Clone)]
pub enum DispatchRequest {
    Investigate(InvestigateRequest),
    ScanAnomalies(ScanRequest),
    GetLiveIntel(LiveIntelRequest),
    GenerateAudioBriefing { text: String },
}

impl DispatchRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Investigate(_) => Operation::Investigate,
            Self::ScanAnomalies(_) => Operation::ScanAnomalies,
            Self::GetLiveIntel(_) => Operation::GetLiveIntel,
            Self::GenerateAudioBriefing { .. } => Operation::GenerateAudioBriefing,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DispatchResult {
    Report(InvestigationReport),
    Feed(Vec<FeedItem>),
    Events(Vec<MonitorEvent>),
    /// Base64-encoded audio.
    Audio(String),
}

pub struct Router {
    config_store: Arc<dyn ConfigStore>,
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl Router {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.provider(), adapter))
            .collect();
        Self {
            config_store,
            adapters,
        }
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.adapters.contains_key(p))
            .collect()
    }

    /// Stored configuration with `partial` merged over it. The provider implied
    /// by the model id wins over the provider field.
    pub fn resolve_config(
        &self,
        operation: Operation,
        partial: &ConfigOverride,
    ) -> Result<SystemConfig, ProviderError> {
        let stored = self.config_store.load().map_err(|err| {
            let provider = partial.provider.unwrap_or_default();
            ProviderError::new(
                ErrorCode::UpstreamError,
                provider,
                operation,
                format!("could not load configuration: {err}"),
            )
            .with_cause(err)
        })?;
        let mut config = stored.with_override(partial);
        if let Some(implied) = provider_for_model(&config.model_id) {
            config.provider = implied;
        }
        Ok(config)
    }

    fn select(
        &self,
        operation: Operation,
        partial: &ConfigOverride,
    ) -> Result<(SystemConfig, Arc<dyn ProviderAdapter>), ProviderError> {
        let config = self.resolve_config(operation, partial)?;
        let adapter = self.adapters.get(&config.provider).cloned().ok_or_else(|| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                config.provider,
                operation,
                format!("no adapter registered for {}", config.provider),
            )
        })?;
        if !supports(config.provider, operation) {
            return Err(ProviderError::unsupported(config.provider, operation));
        }
        debug!(
            provider = %config.provider,
            model_id = %config.model_id,
            operation = %operation,
            search_depth = %config.search_depth,
            "dispatching"
        );
        Ok((config, adapter))
    }

    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        partial: &ConfigOverride,
    ) -> Result<DispatchResult, ProviderError> {
        let (config, adapter) = self.select(request.operation(), partial)?;
        match request {
            DispatchRequest::Investigate(mut req) => {
                req.scope.get_or_insert_with(InvestigationScope::open_investigation);
                adapter.investigate(&req, &config).await.map(DispatchResult::Report)
            }
            DispatchRequest::ScanAnomalies(mut req) => {
                req.scope.get_or_insert_with(InvestigationScope::open_investigation);
                adapter.scan_anomalies(&req, &config).await.map(DispatchResult::Feed)
            }
            DispatchRequest::GetLiveIntel(mut req) => {
                req.scope.get_or_insert_with(InvestigationScope::open_investigation);
                req.monitor.get_or_insert_with(Default::default);
                adapter.get_live_intel(&req, &config).await.map(DispatchResult::Events)
            }
            DispatchRequest::GenerateAudioBriefing { text } => adapter
                .generate_audio_briefing(&text, &config)
                .await
                .map(DispatchResult::Audio),
        }
    }

    pub async fn investigate(
        &self,
        request: InvestigateRequest,
        partial: &ConfigOverride,
    ) -> Result<InvestigationReport, ProviderError> {
        match self.dispatch(DispatchRequest::Investigate(request), partial).await? {
            DispatchResult::Report(report) => Ok(report),
            other => Err(mismatch(Operation::Investigate, &other)),
        }
    }

    pub async fn scan_anomalies(
        &self,
        request: ScanRequest,
        partial: &ConfigOverride,
    ) -> Result<Vec<FeedItem>, ProviderError> {
        match self.dispatch(DispatchRequest::ScanAnomalies(request), partial).await? {
            DispatchResult::Feed(items) => Ok(items),
            other => Err(mismatch(Operation::ScanAnomalies, &other)),
        }
    }

    pub async fn live_intel(
        &self,
        request: LiveIntelRequest,
        partial: &ConfigOverride,
    ) -> Result<Vec<MonitorEvent>, ProviderError> {
        match self.dispatch(DispatchRequest::GetLiveIntel(request), partial).await? {
            DispatchResult::Events(events) => Ok(events),
            other => Err(mismatch(Operation::GetLiveIntel, &other)),
        }
    }

    pub async fn audio_briefing(
        &self,
        text: impl Into<String>,
        partial: &ConfigOverride,
    ) -> Result<String, ProviderError> {
        let request = DispatchRequest::GenerateAudioBriefing { text: text.into() };
        match self.dispatch(request, partial).await? {
            DispatchResult::Audio(audio) => Ok(audio),
            other => Err(mismatch(Operation::GenerateAudioBriefing, &other)),
        }
    }

    /// Drop every adapter's cached client.
    pub fn reset_clients(&self) {
        for adapter in self.adapters.values() {
            adapter.reset();
        }
    }
}

fn mismatch(operation: Operation, result: &DispatchResult) -> ProviderError {
    let kind = match result {
        DispatchResult::Report(_) => "report",
        DispatchResult::Feed(_) => "feed",
        DispatchResult::Events(_) => "events",
        DispatchResult::Audio(_) => "audio",
    };
    ProviderError::new(
        ErrorCode::UpstreamError,
        ProviderId::default(),
        operation,
        format!("dispatch returned {kind} for {operation}"),
    )
}
