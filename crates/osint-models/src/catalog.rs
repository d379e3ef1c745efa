//! Known models, their providers and capabilities, plus the legacy id remap table.

use crate::provider::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub provider: ProviderId,
    pub label: &'static str,
    /// Whether the provider accepts a native response schema for this model.
    pub structured_output: bool,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-2.5-flash",
        provider: ProviderId::Gemini,
        label: "Gemini 2.5 Flash",
        structured_output: true,
    },
    ModelInfo {
        id: "gemini-2.5-pro",
        provider: ProviderId::Gemini,
        label: "Gemini 2.5 Pro",
        structured_output: true,
    },
    ModelInfo {
        id: "gemini-2.5-flash-lite",
        provider: ProviderId::Gemini,
        label: "Gemini 2.5 Flash Lite",
        structured_output: true,
    },
    ModelInfo {
        id: "gemini-2.0-flash-thinking-exp",
        provider: ProviderId::Gemini,
        label: "Gemini 2.0 Flash Thinking",
        structured_output: false,
    },
    ModelInfo {
        id: "gpt-4o",
        provider: ProviderId::OpenAi,
        label: "GPT-4o",
        structured_output: true,
    },
    ModelInfo {
        id: "gpt-4.1",
        provider: ProviderId::OpenAi,
        label: "GPT-4.1",
        structured_output: true,
    },
    ModelInfo {
        id: "o4-mini",
        provider: ProviderId::OpenAi,
        label: "o4-mini",
        structured_output: true,
    },
    ModelInfo {
        id: "claude-sonnet-4-20250514",
        provider: ProviderId::Anthropic,
        label: "Claude Sonnet 4",
        structured_output: false,
    },
    ModelInfo {
        id: "claude-3-5-haiku-latest",
        provider: ProviderId::Anthropic,
        label: "Claude 3.5 Haiku",
        structured_output: false,
    },
    ModelInfo {
        id: "deepseek/deepseek-r1",
        provider: ProviderId::OpenRouter,
        label: "DeepSeek R1 (OpenRouter)",
        structured_output: false,
    },
    ModelInfo {
        id: "meta-llama/llama-3.3-70b-instruct",
        provider: ProviderId::OpenRouter,
        label: "Llama 3.3 70B (OpenRouter)",
        structured_output: false,
    },
    ModelInfo {
        id: "perplexity/sonar",
        provider: ProviderId::OpenRouter,
        label: "Perplexity Sonar (OpenRouter)",
        structured_output: false,
    },
];

/// Retired model ids and their replacements. Applied on every config load and save.
pub const LEGACY_MODEL_IDS: &[(&str, &str)] = &[
    ("gemini-1.5-pro", "gemini-2.5-pro"),
    ("gemini-1.5-flash", "gemini-2.5-flash"),
    ("gemini-2.0-flash-exp", "gemini-2.5-flash"),
    ("gemini-2.5-flash-preview-04-17", "gemini-2.5-flash"),
    ("gemini-2.5-pro-preview-05-06", "gemini-2.5-pro"),
    ("gpt-4", "gpt-4o"),
    ("gpt-4-turbo", "gpt-4o"),
    ("claude-3-opus-20240229", "claude-sonnet-4-20250514"),
    ("claude-3-5-sonnet-20241022", "claude-sonnet-4-20250514"),
];

/// Speech synthesis model used for audio briefings.
pub const GEMINI_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Replace a retired model id with its successor, if it has one.
pub fn remap_legacy_model(id: &str) -> String {
    let trimmed = id.trim();
    LEGACY_MODEL_IDS
        .iter()
        .find(|(old, _)| *old == trimmed)
        .map(|(_, new)| (*new).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// The provider that serves a model id. Catalog entries win; otherwise the id's
/// naming convention decides. `None` when the id is not recognisable.
pub fn provider_for_model(id: &str) -> Option<ProviderId> {
    if let Some(model) = find_model(id) {
        return Some(model.provider);
    }
    let lower = id.trim().to_ascii_lowercase();
    if lower.is_empty() {
        None
    } else if lower.contains('/') {
        Some(ProviderId::OpenRouter)
    } else if lower.starts_with("gemini") {
        Some(ProviderId::Gemini)
    } else if lower.starts_with("claude") {
        Some(ProviderId::Anthropic)
    } else if ["gpt-", "chatgpt", "o1", "o3", "o4"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        Some(ProviderId::OpenAi)
    } else {
        None
    }
}

pub fn default_model(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Gemini => "gemini-2.5-flash",
        ProviderId::OpenAi => "gpt-4o",
        ProviderId::Anthropic => "claude-sonnet-4-20250514",
        ProviderId::OpenRouter => "deepseek/deepseek-r1",
    }
}

/// Whether a native response schema can be sent for this model. Unknown ids are
/// assumed capable unless they are experimental thinking variants.
pub fn supports_structured_output(id: &str) -> bool {
    match find_model(id) {
        Some(model) => model.structured_output,
        None => !id.contains("thinking"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ids_remap_to_catalog_models() {
        for (old, new) in LEGACY_MODEL_IDS {
            assert_eq!(remap_legacy_model(old), *new);
            assert!(find_model(new).is_some(), "{new} missing from catalog");
        }
        assert_eq!(remap_legacy_model(" gpt-4o "), "gpt-4o");
    }

    #[test]
    fn provider_inference() {
        assert_eq!(provider_for_model("gemini-2.5-pro"), Some(ProviderId::Gemini));
        assert_eq!(provider_for_model("gemini-3.0-ultra"), Some(ProviderId::Gemini));
        assert_eq!(provider_for_model("claude-opus-5"), Some(ProviderId::Anthropic));
        assert_eq!(provider_for_model("o3-mini"), Some(ProviderId::OpenAi));
        assert_eq!(
            provider_for_model("mistralai/mistral-large"),
            Some(ProviderId::OpenRouter)
        );
        assert_eq!(provider_for_model("mystery-model"), None);
        assert_eq!(provider_for_model(""), None);
    }

    #[test]
    fn default_models_belong_to_their_provider() {
        for provider in ProviderId::ALL {
            assert_eq!(provider_for_model(default_model(provider)), Some(provider));
        }
    }

    #[test]
    fn structured_output_capability() {
        assert!(supports_structured_output("gemini-2.5-flash"));
        assert!(!supports_structured_output("gemini-2.0-flash-thinking-exp"));
        assert!(supports_structured_output("gemini-9-flash"));
        assert!(!supports_structured_output("gemini-9-thinking"));
    }
}
