//! Operation inputs accepted by adapters and the router.

use serde::{Deserialize, Serialize};

use crate::scope::{DateRange, InvestigationScope};

/// Context from an earlier investigation that a follow-up builds on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParentContext {
    pub topic: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvestigateRequest {
    pub topic: String,
    #[serde(default)]
    pub parent: Option<ParentContext>,
    /// `None` means the canonical open-investigation scope.
    #[serde(default)]
    pub scope: Option<InvestigationScope>,
    /// Replaces "today" as the date the report is written for.
    #[serde(default)]
    pub date_override: Option<String>,
}

impl InvestigateRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn scope(&self) -> InvestigationScope {
        self.scope.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    pub limit: usize,
    #[serde(default)]
    pub priority_sources: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            limit: 6,
            priority_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub region: String,
    pub category: String,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub scope: Option<InvestigationScope>,
    #[serde(default)]
    pub options: ScanOptions,
}

impl ScanRequest {
    pub fn new(region: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn scope(&self) -> InvestigationScope {
        self.scope.clone().unwrap_or_default()
    }

    /// The requested window, else the scope's default window.
    pub fn effective_date_range(&self) -> Option<DateRange> {
        self.date_range
            .clone()
            .or_else(|| self.scope.as_ref().and_then(|s| s.default_date_range.clone()))
    }
}

/// How many live-intel items of each kind to ask for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub social_count: u32,
    pub news_count: u32,
    pub official_count: u32,
    #[serde(default)]
    pub priority_sources: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            social_count: 3,
            news_count: 3,
            official_count: 2,
            priority_sources: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn total(&self) -> u32 {
        self.social_count
            .saturating_add(self.news_count)
            .saturating_add(self.official_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LiveIntelRequest {
    pub topic: String,
    #[serde(default)]
    pub scope: Option<InvestigationScope>,
    #[serde(default)]
    pub monitor: Option<MonitorConfig>,
    /// Content already shown to the user; the upstream is told not to repeat it.
    #[serde(default)]
    pub existing_content: Vec<String>,
}

impl LiveIntelRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn scope(&self) -> InvestigationScope {
        self.scope.clone().unwrap_or_default()
    }

    pub fn monitor(&self) -> MonitorConfig {
        self.monitor.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_scope_defaults_to_open_investigation() {
        let request = InvestigateRequest::new("port authority leak");
        assert_eq!(
            request.scope().id,
            crate::scope::OPEN_INVESTIGATION_ID
        );
    }

    #[test]
    fn scan_date_range_falls_back_to_scope_default() {
        let mut scope = InvestigationScope::corporate_due_diligence();
        scope.default_date_range = Some(DateRange {
            start: "2026-01-01".to_string(),
            end: "2026-06-30".to_string(),
        });
        let mut request = ScanRequest::new("Baltics", "Procurement");
        request.scope = Some(scope);
        assert_eq!(request.effective_date_range().unwrap().start, "2026-01-01");

        request.date_range = Some(DateRange {
            start: "2026-09-01".to_string(),
            end: "2026-09-30".to_string(),
        });
        assert_eq!(request.effective_date_range().unwrap().start, "2026-09-01");
    }

    #[test]
    fn monitor_defaults() {
        let request = LiveIntelRequest::new("border closure");
        assert_eq!(request.monitor().total(), 8);
    }

    #[test]
    fn total_saturates_on_huge_counts() {
        let monitor = MonitorConfig {
            social_count: u32::MAX,
            news_count: 5,
            ..MonitorConfig::default()
        };
        assert_eq!(monitor.total(), u32::MAX);
    }

    #[test]
    fn request_deserializes_from_minimal_json() {
        let request: LiveIntelRequest =
            serde_json::from_str(r#"{"topic": "strike action"}"#).unwrap();
        assert!(request.scope.is_none());
        assert!(request.existing_content.is_empty());
    }
}
