use serde::{Deserialize, Serialize};

use crate::report::Sentiment;

/// Id prefix carried by synthetic placeholder items.
pub const FALLBACK_ID_PREFIX: &str = "fallback-";

/// One anomaly-scan result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub risk_level: RiskLevel,
    pub timestamp: String,
}

impl FeedItem {
    pub fn is_fallback(&self) -> bool {
        self.id.starts_with(FALLBACK_ID_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "LOW" => Some(RiskLevel::Low),
            "MEDIUM" => Some(RiskLevel::Medium),
            "HIGH" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

/// One live-intel item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source_name: String,
    pub content: String,
    pub timestamp: String,
    pub sentiment: Sentiment,
    pub threat_level: ThreatLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MonitorEvent {
    pub fn is_fallback(&self) -> bool {
        self.id.starts_with(FALLBACK_ID_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Social,
    #[default]
    News,
    Official,
}

impl EventType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "SOCIAL" => Some(EventType::Social),
            "NEWS" => Some(EventType::News),
            "OFFICIAL" => Some(EventType::Official),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    Info,
    Caution,
    Critical,
}

impl ThreatLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "INFO" => Some(ThreatLevel::Info),
            "CAUTION" => Some(ThreatLevel::Caution),
            "CRITICAL" => Some(ThreatLevel::Critical),
            _ => None,
        }
    }
}
