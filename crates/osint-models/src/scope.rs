//! Investigation scopes: named domain profiles that feed prompt construction.

use serde::{Deserialize, Serialize};

pub const OPEN_INVESTIGATION_ID: &str = "open-investigation";

/// An inclusive date window expressed as caller-formatted strings (usually `YYYY-MM-DD`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Read-only profile describing what kind of investigation is being run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationScope {
    pub id: String,
    pub name: String,
    pub domain_context: String,
    pub investigation_objective: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub personas: Vec<String>,
    #[serde(default)]
    pub suggested_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_date_range: Option<DateRange>,
}

impl InvestigationScope {
    /// The canonical scope used when a caller does not pick one.
    pub fn open_investigation() -> Self {
        Self {
            id: OPEN_INVESTIGATION_ID.to_string(),
            name: "Open Investigation".to_string(),
            domain_context: "General open-source intelligence across public records, \
                             news reporting and social media"
                .to_string(),
            investigation_objective: "Identify the people and organizations involved, \
                                      their apparent agendas, and concrete leads worth pursuing"
                .to_string(),
            categories: vec![
                "Politics".to_string(),
                "Finance".to_string(),
                "Security".to_string(),
                "Technology".to_string(),
            ],
            personas: vec![
                "Investigative journalist".to_string(),
                "Intelligence analyst".to_string(),
            ],
            suggested_sources: vec![
                "Official government publications".to_string(),
                "Corporate registries".to_string(),
                "Established news outlets".to_string(),
            ],
            default_date_range: None,
        }
    }

    pub fn corporate_due_diligence() -> Self {
        Self {
            id: "corporate-due-diligence".to_string(),
            name: "Corporate Due Diligence".to_string(),
            domain_context: "Company ownership, procurement, litigation and sanctions exposure"
                .to_string(),
            investigation_objective: "Map beneficial ownership, key officers and red flags \
                                      that affect counterparty risk"
                .to_string(),
            categories: vec![
                "Ownership".to_string(),
                "Procurement".to_string(),
                "Litigation".to_string(),
                "Sanctions".to_string(),
            ],
            personas: vec![
                "Compliance officer".to_string(),
                "Forensic accountant".to_string(),
            ],
            suggested_sources: vec![
                "OpenCorporates".to_string(),
                "Court dockets".to_string(),
                "Sanctions lists".to_string(),
                "Public tender portals".to_string(),
            ],
            default_date_range: None,
        }
    }

    pub fn information_integrity() -> Self {
        Self {
            id: "information-integrity".to_string(),
            name: "Information Integrity".to_string(),
            domain_context: "Coordinated narratives, disinformation campaigns and \
                             inauthentic amplification"
                .to_string(),
            investigation_objective: "Trace narrative origins, amplifier networks and the \
                                      actors who benefit"
                .to_string(),
            categories: vec![
                "Narratives".to_string(),
                "Amplification".to_string(),
                "Elections".to_string(),
            ],
            personas: vec![
                "Disinformation researcher".to_string(),
                "Fact-checker".to_string(),
            ],
            suggested_sources: vec![
                "Platform transparency reports".to_string(),
                "Fact-checking organizations".to_string(),
                "Archived social posts".to_string(),
            ],
            default_date_range: None,
        }
    }
}

impl Default for InvestigationScope {
    fn default() -> Self {
        Self::open_investigation()
    }
}

/// All built-in scope presets.
pub fn presets() -> Vec<InvestigationScope> {
    vec![
        InvestigationScope::open_investigation(),
        InvestigationScope::corporate_due_diligence(),
        InvestigationScope::information_integrity(),
    ]
}

/// Look up a built-in preset by id.
pub fn find_preset(id: &str) -> Option<InvestigationScope> {
    presets().into_iter().find(|s| s.id == id)
}
