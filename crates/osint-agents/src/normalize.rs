//! Total conversions from untrusted parsed JSON into the strict output contracts.
//!
//! Nothing here fails: invalid fields fall back to documented defaults and
//! unusable records are dropped.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use osint_models::{
    ConfigSnapshot, Entity, EntityType, EventType, FeedItem, InvestigationReport, MonitorEvent,
    RiskLevel, Sentiment, Source, ThreatLevel, EMPTY_SUMMARY, UNTITLED_SOURCE,
};
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

pub const UNKNOWN_SOURCE_NAME: &str = "Unknown Source";

/// Keys under which models tend to wrap a list they were asked to return bare.
const LIST_WRAPPER_KEYS: &[&str] = &["items", "feed", "events", "results", "data"];

/// Characters that trail URLs lifted out of prose or markdown.
const URL_TRAILING_JUNK: &[char] = &[')', '.', ',', ';', ']', '}'];

/// Flatten any JSON value into display text.
pub fn to_display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !is_falsy(item))
            .map(to_display_text)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => {
            if let Some(text) = present(map, "text") {
                to_display_text(text)
            } else if let Some(content) = present(map, "content") {
                to_display_text(content)
            } else {
                value.to_string()
            }
        }
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Trimmed display text of `map[key]`, `None` when absent or blank.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    let text = to_display_text(map.get(key)?);
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `map[key]` as a non-empty string, ignoring every other shape.
fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn label_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    text_field(map, key).map(|s| s.to_ascii_uppercase())
}

/// Any array of values becomes a list of non-empty strings; anything else is empty.
pub fn normalize_string_list(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| to_display_text(item).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn normalize_entities(value: &Value) -> Vec<Entity> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(normalize_entity).collect()
}

fn normalize_entity(value: &Value) -> Option<Entity> {
    match value {
        Value::String(name) => {
            let name = name.trim();
            (!name.is_empty()).then(|| Entity::unknown(name))
        }
        Value::Object(map) => {
            let name = text_field(map, "name")?;
            let kind = label_field(map, "type")
                .and_then(|label| EntityType::from_label(&label))
                .unwrap_or(EntityType::Unknown);
            let sentiment =
                label_field(map, "sentiment").and_then(|label| Sentiment::from_label(&label));
            Some(Entity {
                name,
                kind,
                role: text_field(map, "role"),
                sentiment,
            })
        }
        _ => None,
    }
}

/// Canonical form of a URL lifted from model output, or `None` if it is not an
/// absolute URL. The fragment is always removed.
pub fn clean_url(raw: &str) -> Option<String> {
    let candidate = raw.trim().trim_end_matches(URL_TRAILING_JUNK);
    if candidate.is_empty() {
        return None;
    }
    let mut url = Url::parse(candidate).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

pub fn normalize_source(value: &Value) -> Option<Source> {
    match value {
        Value::String(raw) => Some(Source {
            title: UNTITLED_SOURCE.to_string(),
            url: clean_url(raw)?,
        }),
        Value::Object(map) => {
            let raw = string_field(map, "url").or_else(|| string_field(map, "uri"))?;
            Some(Source {
                title: text_field(map, "title").unwrap_or_else(|| UNTITLED_SOURCE.to_string()),
                url: clean_url(&raw)?,
            })
        }
        _ => None,
    }
}

pub fn normalize_sources(value: &Value) -> Vec<Source> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    dedupe_sources(items.iter().filter_map(normalize_source))
}

/// Drop sources whose URL was already seen, comparing case-insensitively.
/// The first occurrence, and so its title, wins.
pub fn dedupe_sources(sources: impl IntoIterator<Item = Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.url.to_lowercase()))
        .collect()
}

/// Model-declared sources first, then transport-native citations.
pub fn merge_sources(declared: Vec<Source>, citations: Vec<Source>) -> Vec<Source> {
    dedupe_sources(declared.into_iter().chain(citations))
}

/// Accept a bare array, or an object wrapping the array under a conventional key.
fn item_array(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => LIST_WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

/// `{prefix}-{epoch-ms}-{index}`, used when the upstream gave no usable id.
pub fn generated_id(prefix: &str, now: DateTime<Utc>, index: usize) -> String {
    format!("{prefix}-{}-{index}", now.timestamp_millis())
}

pub fn normalize_feed_items(
    value: &Value,
    fallback_category: &str,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let stamp = now.to_rfc3339();
    item_array(value)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let map = item.as_object()?;
            let title = text_field(map, "title")?;
            Some(FeedItem {
                id: string_field(map, "id").unwrap_or_else(|| generated_id("scan", now, index)),
                title,
                category: text_field(map, "category")
                    .unwrap_or_else(|| fallback_category.to_string()),
                risk_level: label_field(map, "riskLevel")
                    .and_then(|label| RiskLevel::from_label(&label))
                    .unwrap_or_default(),
                timestamp: string_field(map, "timestamp").unwrap_or_else(|| stamp.clone()),
            })
        })
        .collect()
}

pub fn normalize_monitor_events(value: &Value, now: DateTime<Utc>) -> Vec<MonitorEvent> {
    let stamp = now.to_rfc3339();
    item_array(value)
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let map = item.as_object()?;
            let content = text_field(map, "content")?;
            let url = string_field(map, "url")
                .or_else(|| string_field(map, "uri"))
                .and_then(|raw| clean_url(&raw));
            Some(MonitorEvent {
                id: string_field(map, "id").unwrap_or_else(|| generated_id("intel", now, index)),
                kind: label_field(map, "type")
                    .and_then(|label| EventType::from_label(&label))
                    .unwrap_or_default(),
                source_name: text_field(map, "sourceName")
                    .or_else(|| text_field(map, "source"))
                    .unwrap_or_else(|| UNKNOWN_SOURCE_NAME.to_string()),
                content,
                timestamp: string_field(map, "timestamp").unwrap_or_else(|| stamp.clone()),
                sentiment: label_field(map, "sentiment")
                    .and_then(|label| Sentiment::from_label(&label))
                    .unwrap_or(Sentiment::Neutral),
                threat_level: label_field(map, "threatLevel")
                    .and_then(|label| ThreatLevel::from_label(&label))
                    .unwrap_or_default(),
                url,
            })
        })
        .collect()
}

/// Everything a report needs besides the parsed model output.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub topic: String,
    pub parent_topic: Option<String>,
    pub date_str: String,
    pub raw_text: String,
    pub config: ConfigSnapshot,
    /// Transport-native citations, merged after the model's own sources.
    pub citations: Vec<Source>,
    pub now: DateTime<Utc>,
}

pub fn normalize_report(value: &Value, ctx: ReportContext) -> InvestigationReport {
    let empty = Map::new();
    let map = value.as_object().unwrap_or(&empty);
    let field = |key: &str| map.get(key).unwrap_or(&Value::Null);

    let summary = text_field(map, "summary").unwrap_or_else(|| EMPTY_SUMMARY.to_string());
    let sources = merge_sources(normalize_sources(field("sources")), ctx.citations);

    InvestigationReport {
        id: Uuid::new_v4(),
        topic: ctx.topic,
        parent_topic: ctx.parent_topic,
        date_str: ctx.date_str,
        summary,
        entities: normalize_entities(field("entities")),
        agendas: normalize_string_list(field("agendas")),
        leads: normalize_string_list(field("leads")),
        sources,
        raw_text: ctx.raw_text,
        config: ctx.config,
        created_at: ctx.now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use osint_models::{ProviderId, SearchDepth};
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn context() -> ReportContext {
        ReportContext {
            topic: "Atlas Holdings".to_string(),
            parent_topic: None,
            date_str: "October 18, 2026".to_string(),
            raw_text: "raw".to_string(),
            config: ConfigSnapshot {
                provider: ProviderId::Gemini,
                model_id: "gemini-2.5-flash".to_string(),
                persona: "Analyst".to_string(),
                search_depth: SearchDepth::Standard,
                thinking_budget: 0,
            },
            citations: vec![],
            now: fixed_now(),
        }
    }

    #[test]
    fn display_text_of_scalars_and_arrays() {
        assert_eq!(to_display_text(&json!("a")), "a");
        assert_eq!(to_display_text(&json!(42)), "42");
        assert_eq!(to_display_text(&json!(true)), "true");
        assert_eq!(to_display_text(&Value::Null), "");
        assert_eq!(
            to_display_text(&json!(["a", null, "", 0, false, ["b", "c"], 7])),
            "a b c 7"
        );
    }

    #[test]
    fn display_text_of_objects() {
        assert_eq!(to_display_text(&json!({"text": "t", "content": "c"})), "t");
        assert_eq!(to_display_text(&json!({"content": {"text": "inner"}})), "inner");
        assert_eq!(to_display_text(&json!({"text": null, "content": "c"})), "c");
        assert_eq!(to_display_text(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn string_list_drops_empty_and_non_arrays() {
        assert!(normalize_string_list(&json!("not a list")).is_empty());
        assert!(normalize_string_list(&json!({"leads": []})).is_empty());
        assert_eq!(
            normalize_string_list(&json!(["a", "", "  ", null, {"text": "b"}, 3])),
            vec!["a", "b", "3"]
        );
    }

    #[test]
    fn string_list_is_identity_on_clean_strings() {
        let clean = vec!["Pull tender records".to_string(), "Call the registrar".to_string()];
        let value = json!(clean);
        assert_eq!(normalize_string_list(&value), clean);
        let again = json!(normalize_string_list(&value));
        assert_eq!(normalize_string_list(&again), clean);
    }

    #[test]
    fn entities_coerce_invalid_enums() {
        let entities = normalize_entities(&json!([
            {"name": "Atlas Holdings", "type": "organization", "role": "Contractor", "sentiment": "negative"},
            {"name": "J. Doe", "type": "ALIEN", "sentiment": "ambivalent"},
            {"name": "", "type": "PERSON"},
            {"type": "PERSON"},
            {"name": {"text": "Port Authority"}},
            "  Ministry of Works ",
            "",
            17
        ]));

        assert_eq!(entities.len(), 4);
        assert_eq!(entities[0].kind, EntityType::Organization);
        assert_eq!(entities[0].sentiment, Some(Sentiment::Negative));
        assert_eq!(entities[0].role.as_deref(), Some("Contractor"));
        assert_eq!(entities[1].kind, EntityType::Unknown);
        assert_eq!(entities[1].sentiment, None);
        assert_eq!(entities[2].name, "Port Authority");
        assert_eq!(entities[3], Entity::unknown("Ministry of Works"));
        assert!(entities.iter().all(|e| !e.name.is_empty()));
    }

    #[test]
    fn clean_url_strips_trailing_junk_and_fragment() {
        assert_eq!(
            clean_url(" https://example.com/a?b=1#section).; ").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(
            clean_url("https://example.com/path],}").as_deref(),
            Some("https://example.com/path")
        );
        assert_eq!(clean_url("example.com/relative"), None);
        assert_eq!(clean_url("not a url"), None);
        assert_eq!(clean_url(")."), None);
    }

    #[test]
    fn sources_dedupe_case_insensitively_across_url_and_uri() {
        let sources = normalize_sources(&json!([
            {"title": "First", "url": "https://Example.com/a"},
            {"title": "Second", "uri": "https://example.com/a"},
            {"title": "Broken", "url": "::nonsense"},
            {"url": "https://example.com/b#frag"},
            "https://example.com/b",
        ]));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "First");
        assert_eq!(sources[1].title, UNTITLED_SOURCE);
        assert_eq!(sources[1].url, "https://example.com/b");
    }

    #[test]
    fn source_dedupe_is_idempotent() {
        let once = normalize_sources(&json!([
            {"url": "https://Example.com/a"},
            {"uri": "https://example.com/a"}
        ]));
        assert_eq!(once.len(), 1);
        let twice = dedupe_sources(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_keeps_declared_title() {
        let merged = merge_sources(
            vec![Source {
                title: "Registry".to_string(),
                url: "https://example.com/contracts/atlas".to_string(),
            }],
            vec![
                Source {
                    title: "example.com".to_string(),
                    url: "https://EXAMPLE.com/contracts/atlas".to_string(),
                },
                Source {
                    title: "Court filing".to_string(),
                    url: "https://courts.example.org/123".to_string(),
                },
            ],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Registry");
    }

    #[test]
    fn feed_items_defaults() {
        let now = fixed_now();
        let items = normalize_feed_items(
            &json!([
                {"id": "a1", "title": "Shell company surge", "category": "Finance", "riskLevel": "high", "timestamp": "2026-10-17T08:00:00Z"},
                {"id": 99, "title": "Port delays", "riskLevel": "EXTREME"},
                {"category": "Finance"},
                "stray"
            ]),
            "Logistics",
            now,
        );
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].risk_level, RiskLevel::High);
        assert_eq!(items[0].timestamp, "2026-10-17T08:00:00Z");
        assert_eq!(items[1].risk_level, RiskLevel::Medium);
        assert_eq!(items[1].category, "Logistics");
        assert_eq!(
            items[1].id,
            format!("scan-{}-1", now.timestamp_millis())
        );
        assert_eq!(items[1].timestamp, now.to_rfc3339());
    }

    #[test]
    fn feed_items_unwrap_conventional_wrapper() {
        let items = normalize_feed_items(
            &json!({"items": [{"title": "Wrapped"}]}),
            "General",
            fixed_now(),
        );
        assert_eq!(items.len(), 1);
        assert!(normalize_feed_items(&json!({"other": []}), "General", fixed_now()).is_empty());
        assert!(normalize_feed_items(&json!("x"), "General", fixed_now()).is_empty());
    }

    #[test]
    fn monitor_events_defaults_and_content_coercion() {
        let now = fixed_now();
        let events = normalize_monitor_events(
            &json!([
                {"type": "social", "sourceName": "@watcher", "content": {"text": "Convoy spotted"},
                 "sentiment": "NEGATIVE", "threatLevel": "critical", "url": "https://x.example/1#top"},
                {"type": "RADIO", "content": ["Statement", "issued"], "sentiment": "meh", "threatLevel": "??"},
                {"type": "NEWS", "content": ""}
            ]),
            now,
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventType::Social);
        assert_eq!(events[0].content, "Convoy spotted");
        assert_eq!(events[0].threat_level, ThreatLevel::Critical);
        assert_eq!(events[0].url.as_deref(), Some("https://x.example/1"));
        assert_eq!(events[1].kind, EventType::News);
        assert_eq!(events[1].content, "Statement issued");
        assert_eq!(events[1].sentiment, Sentiment::Neutral);
        assert_eq!(events[1].threat_level, ThreatLevel::Info);
        assert_eq!(events[1].source_name, UNKNOWN_SOURCE_NAME);
        assert_eq!(events[1].id, format!("intel-{}-1", now.timestamp_millis()));
    }

    #[test]
    fn report_from_garbage_keeps_every_list() {
        let report = normalize_report(&json!("prose only"), context());
        assert_eq!(report.summary, EMPTY_SUMMARY);
        assert!(report.entities.is_empty());
        assert!(report.agendas.is_empty());
        assert!(report.leads.is_empty());
        assert!(report.sources.is_empty());
        assert_eq!(report.raw_text, "raw");
    }

    #[test]
    fn report_merges_citations_after_declared_sources() {
        let mut ctx = context();
        ctx.citations = vec![Source {
            title: "Grounding title".to_string(),
            url: "https://example.com/contracts/atlas".to_string(),
        }];
        let report = normalize_report(
            &json!({
                "summary": "  X  ",
                "entities": [{"name": "Atlas Holdings", "type": "ORGANIZATION"}],
                "agendas": "not a list",
                "leads": ["Request the tender file"],
                "sources": [{"title": "Registry", "url": "https://example.com/contracts/atlas"}]
            }),
            ctx,
        );
        assert_eq!(report.summary, "X");
        assert_eq!(report.entities.len(), 1);
        assert!(report.agendas.is_empty());
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].title, "Registry");
        assert_eq!(report.created_at, fixed_now());
    }
}
