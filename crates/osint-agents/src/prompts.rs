//! Prompt construction. Every function here is pure: the caller supplies the
//! date and any context, so the same inputs always produce the same text.

use chrono::NaiveDate;
use osint_models::{
    DateRange, InvestigationScope, MonitorConfig, Operation, ParentContext, ScanOptions, SearchDepth,
    SystemConfig,
};
use serde_json::{json, Value};

/// Human date written into reports, e.g. "October 18, 2026".
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn depth_guidance(depth: SearchDepth) -> &'static str {
    match depth {
        SearchDepth::Quick => {
            "Work quickly: cover the most prominent facts only and keep every list short."
        }
        SearchDepth::Standard => {
            "Be thorough but focused: confirm key claims against at least two sources."
        }
        SearchDepth::Deep => {
            "Dig deep: follow secondary connections, ownership chains and historical records, \
             and prefer primary documents over commentary."
        }
    }
}

fn scope_block(scope: &InvestigationScope) -> String {
    let mut block = format!(
        "## SCOPE: {}\n\
         Domain: {}\n\
         Objective: {}\n",
        scope.name, scope.domain_context, scope.investigation_objective
    );
    if !scope.suggested_sources.is_empty() {
        block.push_str(&format!(
            "Preferred sources: {}\n",
            scope.suggested_sources.join("; ")
        ));
    }
    block
}

fn priority_block(priority_sources: &[String]) -> String {
    if priority_sources.is_empty() {
        String::new()
    } else {
        format!(
            "Check these sources first: {}\n",
            priority_sources.join(", ")
        )
    }
}

/// Example of the JSON shape each operation must return.
fn example_output(op: Operation) -> Value {
    match op {
        Operation::Investigate => json!({
            "summary": "<two or three paragraph narrative>",
            "entities": [
                {"name": "<name>", "type": "PERSON|ORGANIZATION|UNKNOWN",
                 "role": "<role in the story>", "sentiment": "POSITIVE|NEGATIVE|NEUTRAL"}
            ],
            "agendas": ["<apparent motive or agenda>"],
            "leads": ["<concrete next investigative step>"],
            "sources": [{"title": "<page title>", "url": "<absolute url>"}]
        }),
        Operation::ScanAnomalies => json!([
            {"id": "<short id>", "title": "<one line headline>", "category": "<category>",
             "riskLevel": "LOW|MEDIUM|HIGH", "timestamp": "<ISO-8601>"}
        ]),
        Operation::GetLiveIntel => json!([
            {"type": "SOCIAL|NEWS|OFFICIAL", "sourceName": "<outlet or account>",
             "content": "<what was said or reported>", "timestamp": "<ISO-8601>",
             "sentiment": "NEGATIVE|NEUTRAL|POSITIVE", "threatLevel": "INFO|CAUTION|CRITICAL",
             "url": "<absolute url>"}
        ]),
        Operation::GenerateAudioBriefing => Value::Null,
    }
}

/// Textual JSON instruction, used when the upstream cannot enforce a schema natively.
pub fn json_instruction(op: Operation) -> Option<String> {
    let example = example_output(op);
    if example.is_null() {
        return None;
    }
    let shape = serde_json::to_string_pretty(&example).unwrap_or_default();
    Some(format!(
        "You MUST respond with ONLY valid JSON matching this shape, with no prose before or after it:\n{shape}"
    ))
}

fn enum_string(values: &[&str]) -> Value {
    json!({"type": "STRING", "enum": values})
}

fn string() -> Value {
    json!({"type": "STRING"})
}

/// Native structured-output schema (OpenAPI subset accepted by `responseSchema`).
pub fn response_schema(op: Operation) -> Option<Value> {
    match op {
        Operation::Investigate => Some(json!({
            "type": "OBJECT",
            "properties": {
                "summary": string(),
                "entities": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": string(),
                            "type": enum_string(&["PERSON", "ORGANIZATION", "UNKNOWN"]),
                            "role": string(),
                            "sentiment": enum_string(&["POSITIVE", "NEGATIVE", "NEUTRAL"])
                        },
                        "required": ["name", "type"]
                    }
                },
                "agendas": {"type": "ARRAY", "items": string()},
                "leads": {"type": "ARRAY", "items": string()},
                "sources": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {"title": string(), "url": string()},
                        "required": ["url"]
                    }
                }
            },
            "required": ["summary", "entities", "agendas", "leads"]
        })),
        Operation::ScanAnomalies => Some(json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "id": string(),
                    "title": string(),
                    "category": string(),
                    "riskLevel": enum_string(&["LOW", "MEDIUM", "HIGH"]),
                    "timestamp": string()
                },
                "required": ["title", "riskLevel"]
            }
        })),
        Operation::GetLiveIntel => Some(json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "type": enum_string(&["SOCIAL", "NEWS", "OFFICIAL"]),
                    "sourceName": string(),
                    "content": string(),
                    "timestamp": string(),
                    "sentiment": enum_string(&["NEGATIVE", "NEUTRAL", "POSITIVE"]),
                    "threatLevel": enum_string(&["INFO", "CAUTION", "CRITICAL"]),
                    "url": string()
                },
                "required": ["type", "content"]
            }
        })),
        Operation::GenerateAudioBriefing => None,
    }
}

/// Shared system instruction: who the model is acting as.
pub fn system_prompt(config: &SystemConfig, scope: &InvestigationScope) -> String {
    format!(
        "You are an open-source intelligence researcher acting as: {}.\n\
         Only report what public sources support. Never invent URLs; cite the pages you used.\n\n\
         {}\n\
         ## DEPTH\n\
         {}",
        config.persona,
        scope_block(scope),
        depth_guidance(config.search_depth)
    )
}

pub fn investigation_prompt(
    topic: &str,
    parent: Option<&ParentContext>,
    date_str: &str,
) -> String {
    let mut prompt = format!(
        "Investigate the following topic as of {date_str}:\n\"{topic}\"\n\n"
    );
    if let Some(parent) = parent {
        prompt.push_str(&format!(
            "This is a follow-up to an earlier investigation into \"{}\".\n\
             Earlier findings: {}\n\
             Focus on what is new or connects the two; do not repeat the earlier summary.\n\n",
            parent.topic, parent.summary
        ));
    }
    prompt.push_str(
        "## OUTPUT\n\
         - summary: a concise narrative of what is known\n\
         - entities: people and organizations involved, typed PERSON, ORGANIZATION or UNKNOWN\n\
         - agendas: apparent motives of the main actors\n\
         - leads: actionable next steps a journalist could take, each starting with a verb\n\
         - sources: every page you relied on, with title and absolute URL",
    );
    prompt
}

fn date_range_clause(range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!("between {} and {}", range.start, range.end),
        None => "in the last 7 days".to_string(),
    }
}

pub fn scan_prompt(
    region: &str,
    category: &str,
    date_range: Option<&DateRange>,
    options: &ScanOptions,
) -> String {
    format!(
        "Scan public reporting {} for anomalies in the \"{category}\" category \
         concerning {region}.\n\
         An anomaly is an unusual event, pattern break or emerging story worth investigating.\n\
         {}\
         Return at most {} items, most significant first. Rate each riskLevel LOW, MEDIUM or HIGH.",
        date_range_clause(date_range),
        priority_block(&options.priority_sources),
        options.limit
    )
}

pub fn live_intel_prompt(topic: &str, monitor: &MonitorConfig, existing_content: &[String]) -> String {
    let mut prompt = format!(
        "Gather the latest live intelligence on \"{topic}\".\n\
         Return {} items: {} SOCIAL posts, {} NEWS reports and {} OFFICIAL statements.\n\
         {}",
        monitor.total(),
        monitor.social_count,
        monitor.news_count,
        monitor.official_count,
        priority_block(&monitor.priority_sources)
    );
    if !existing_content.is_empty() {
        prompt.push_str("\nThe user has already seen the following; do not repeat them:\n");
        for item in existing_content {
            prompt.push_str(&format!("- {item}\n"));
        }
    }
    prompt
}

pub fn audio_briefing_prompt(text: &str) -> String {
    format!("Read this intelligence briefing in a calm, clear newsroom voice:\n\n{text}")
}
