//! Gemini over the `generateContent` REST API, with typed request and
//! response bodies.

use async_trait::async_trait;
use osint_models::catalog::GEMINI_TTS_MODEL;
use osint_models::{Operation, ProviderId, Source};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::http::decode_reply;
use crate::adapter::{Completion, CompletionBackend, CompletionRequest};
use crate::client::ProviderClient;
use crate::error::{ErrorCode, ProviderError};
use crate::normalize::clean_url;
use crate::prompts::audio_briefing_prompt;

pub const TTS_VOICE: &str = "Kore";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

impl Content {
    fn user(text: String) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart { text }],
        }
    }

    fn system(text: String) -> Self {
        Self {
            role: None,
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ResponsePart {
    text: Option<String>,
    thought: Option<bool>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Concatenated answer text, skipping thought summaries.
    fn text(&self) -> String {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought.unwrap_or(false))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn citations(&self) -> Vec<Source> {
        self.candidates
            .iter()
            .filter_map(|c| c.grounding_metadata.as_ref())
            .flat_map(|m| m.grounding_chunks.iter())
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                let url = clean_url(web.uri.as_deref()?)?;
                let title = web
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(osint_models::UNTITLED_SOURCE)
                    .to_string();
                Some(Source { title, url })
            })
            .collect()
    }

    fn finish_reason(&self) -> Option<String> {
        self.first_candidate()
            .and_then(|c| c.finish_reason.clone())
            .or_else(|| {
                self.prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.clone())
            })
    }

    fn audio(&self) -> Option<&InlineData> {
        self.first_candidate()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }
}

fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
    let native = request.structured_output && request.schema.is_some();
    let prompt = if native {
        request.prompt.clone()
    } else {
        request.prompt_with_instruction()
    };

    let mut generation_config = GenerationConfig::default();
    if native {
        generation_config.response_mime_type = Some("application/json");
        generation_config.response_schema = request.schema.clone();
    }
    if request.thinking_budget > 0 {
        generation_config.thinking_config = Some(ThinkingConfig {
            thinking_budget: request.thinking_budget,
        });
    }

    GenerateContentRequest {
        contents: vec![Content::user(prompt)],
        system_instruction: Some(Content::system(request.system.clone())),
        tools: if request.web_search {
            vec![json!({"googleSearch": {}})]
        } else {
            Vec::new()
        },
        generation_config,
    }
}

fn speech_request(text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user(audio_briefing_prompt(text))],
        system_instruction: None,
        tools: Vec::new(),
        generation_config: GenerationConfig {
            response_modalities: Some(vec!["AUDIO"]),
            speech_config: Some(json!({
                "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": TTS_VOICE}}
            })),
            ..GenerationConfig::default()
        },
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiBackend;

impl GeminiBackend {
    async fn generate(
        &self,
        client: &ProviderClient,
        model_id: &str,
        operation: Operation,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let body = serde_json::to_value(body).map_err(|err| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                ProviderId::Gemini,
                operation,
                format!("could not encode request: {err}"),
            )
        })?;
        let url = client.endpoint(&format!("models/{model_id}:generateContent"));
        let headers = [("x-goog-api-key", client.api_key.clone())];
        let reply = client
            .transport
            .post_json(&url, &headers, &body)
            .await
            .map_err(|err| {
                ProviderError::new(ErrorCode::UpstreamError, ProviderId::Gemini, operation, err.to_string())
                    .with_cause(err)
            })?;
        let value = decode_reply(&reply, ProviderId::Gemini, operation)?;
        serde_json::from_value(value).map_err(|err| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                ProviderId::Gemini,
                operation,
                format!("unexpected response shape: {err}"),
            )
            .with_status(reply.status)
        })
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn provider(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn complete(
        &self,
        client: &ProviderClient,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let response = self
            .generate(client, &request.model_id, request.operation, &build_request(request))
            .await?;
        let text = response.text();
        let finish_reason = response.finish_reason();
        if text.trim().is_empty() {
            return Err(ProviderError::new(
                ErrorCode::UpstreamError,
                ProviderId::Gemini,
                request.operation,
                format!(
                    "empty response (finish reason: {})",
                    finish_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }
        Ok(Completion {
            text,
            citations: response.citations(),
            finish_reason,
        })
    }

    fn supports_speech(&self) -> bool {
        true
    }

    async fn synthesize_speech(
        &self,
        client: &ProviderClient,
        text: &str,
    ) -> Result<String, ProviderError> {
        let operation = Operation::GenerateAudioBriefing;
        let response = self
            .generate(client, GEMINI_TTS_MODEL, operation, &speech_request(text))
            .await?;
        match response.audio() {
            Some(audio) => {
                tracing::debug!(mime_type = %audio.mime_type, bytes = audio.data.len(), "speech synthesized");
                Ok(audio.data.clone())
            }
            None => Err(ProviderError::new(
                ErrorCode::UpstreamError,
                ProviderId::Gemini,
                operation,
                format!(
                    "no audio in response (finish reason: {})",
                    response.finish_reason().as_deref().unwrap_or("unknown")
                ),
            )),
        }
    }
}
