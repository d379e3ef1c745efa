//! Placeholder results shown when a scan or live-intel call cannot be served.
//! Every id carries `FALLBACK_ID_PREFIX` so callers can tell them apart.

use chrono::{DateTime, Utc};
use osint_models::{
    EventType, FeedItem, MonitorEvent, RiskLevel, Sentiment, ThreatLevel, FALLBACK_ID_PREFIX,
};

fn fallback_id(kind: &str, now: DateTime<Utc>, index: usize) -> String {
    format!("{FALLBACK_ID_PREFIX}{kind}-{}-{index}", now.timestamp_millis())
}

pub fn feed_items(category: &str, now: DateTime<Utc>) -> Vec<FeedItem> {
    let stamp = now.to_rfc3339();
    [
        (format!("Live scan unavailable for {category}"), RiskLevel::Low),
        ("Upstream source did not return usable results".to_string(), RiskLevel::Low),
        ("Retry the scan or switch model in settings".to_string(), RiskLevel::Low),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (title, risk_level))| FeedItem {
        id: fallback_id("scan", now, index),
        title,
        category: category.to_string(),
        risk_level,
        timestamp: stamp.clone(),
    })
    .collect()
}

pub fn monitor_events(topic: &str, now: DateTime<Utc>) -> Vec<MonitorEvent> {
    let stamp = now.to_rfc3339();
    [
        (EventType::Social, "Social monitor", format!("No social chatter could be retrieved for \"{topic}\".")),
        (EventType::News, "News monitor", "News feeds are temporarily unavailable.".to_string()),
        (EventType::Official, "Official monitor", "No official statements could be retrieved.".to_string()),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (kind, source_name, content))| MonitorEvent {
        id: fallback_id("intel", now, index),
        kind,
        source_name: source_name.to_string(),
        content,
        timestamp: stamp.clone(),
        sentiment: Sentiment::Neutral,
        threat_level: ThreatLevel::Info,
        url: None,
    })
    .collect()
}
