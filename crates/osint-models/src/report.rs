use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SearchDepth;
use crate::provider::ProviderId;

/// Summary used when the upstream produced no usable summary text.
pub const EMPTY_SUMMARY: &str = "No summary available.";

/// Title used for sources the upstream cited without a title.
pub const UNTITLED_SOURCE: &str = "Untitled Source";

/// A finished investigation, ready for rendering and persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationReport {
    pub id: Uuid,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_topic: Option<String>,
    pub date_str: String,
    pub summary: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub agendas: Vec<String>,
    #[serde(default)]
    pub leads: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Verbatim upstream payload, kept for audit and debugging.
    pub raw_text: String,
    pub config: ConfigSnapshot,
    pub created_at: DateTime<Utc>,
}

/// The configuration that produced a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub provider: ProviderId,
    pub model_id: String,
    pub persona: String,
    pub search_depth: SearchDepth,
    pub thinking_budget: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl Entity {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityType::Unknown,
            role: None,
            sentiment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    Unknown,
}

impl EntityType {
    /// Match an already upper-cased label against the closed set.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PERSON" => Some(EntityType::Person),
            "ORGANIZATION" => Some(EntityType::Organization),
            "UNKNOWN" => Some(EntityType::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "POSITIVE" => Some(Sentiment::Positive),
            "NEGATIVE" => Some(Sentiment::Negative),
            "NEUTRAL" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// A cited source. `url` is always an absolute URL with no fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> InvestigationReport {
        InvestigationReport {
            id: Uuid::new_v4(),
            topic: "Atlas Holdings procurement".to_string(),
            parent_topic: None,
            date_str: "October 18, 2026".to_string(),
            summary: "Contract irregularities".to_string(),
            entities: vec![Entity {
                name: "Atlas Holdings".to_string(),
                kind: EntityType::Organization,
                role: Some("Primary contractor".to_string()),
                sentiment: Some(Sentiment::Negative),
            }],
            agendas: vec!["Win municipal contracts".to_string()],
            leads: vec!["Pull the 2025 tender records".to_string()],
            sources: vec![Source {
                title: "Registry".to_string(),
                url: "https://example.com/contracts/atlas".to_string(),
            }],
            raw_text: "{}".to_string(),
            config: ConfigSnapshot {
                provider: ProviderId::Gemini,
                model_id: "gemini-2.5-flash".to_string(),
                persona: "Investigative journalist".to_string(),
                search_depth: SearchDepth::Standard,
                thinking_budget: 0,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn report_uses_camel_case_contract() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert!(json.get("dateStr").is_some());
        assert!(json.get("rawText").is_some());
        assert!(json.get("parentTopic").is_none());
        assert_eq!(json["entities"][0]["type"], "ORGANIZATION");
        assert_eq!(json["entities"][0]["sentiment"], "NEGATIVE");
        assert_eq!(json["config"]["modelId"], "gemini-2.5-flash");
    }

    #[test]
    fn report_missing_lists_deserialize_empty() {
        let mut json = serde_json::to_value(sample_report()).unwrap();
        let obj = json.as_object_mut().unwrap();
        obj.remove("entities");
        obj.remove("leads");
        let report: InvestigationReport = serde_json::from_value(json).unwrap();
        assert!(report.entities.is_empty());
        assert!(report.leads.is_empty());
    }

    #[test]
    fn labels_are_exact_upper_case() {
        assert_eq!(EntityType::from_label("PERSON"), Some(EntityType::Person));
        assert_eq!(EntityType::from_label("person"), None);
        assert_eq!(Sentiment::from_label("NEUTRAL"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("MIXED"), None);
    }
}
