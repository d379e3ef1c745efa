use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use osint_models::{
    ConfigOverride, FeedItem, InvestigationReport, MonitorEvent, ProviderId, SystemConfig,
};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::schema::{credential_key, kinds, STORE_DDL, SYSTEM_CONFIG_KEY};
use crate::{ConfigStore, CredentialStore, RecordStore};

/// Local SQLite store for settings, credentials and finished results.
///
/// Access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file. Creates the schema and enables WAL.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(STORE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database. Useful for testing and one-off runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(STORE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached("SELECT value_json FROM settings WHERE key = ?1")?;
        let value = stmt
            .query_row(rusqlite::params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put_setting<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value_json = serde_json::to_string(value)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value_json, now_stamp()],
        )?;
        Ok(())
    }

    /// `rows` carry the full row key. Upstream-supplied ids are not unique across
    /// calls, so feed items and events get a fresh key per row.
    fn insert_records<T: Serialize>(
        &self,
        kind: &str,
        topic: &str,
        rows: &[(String, &T, String)],
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO records (id, kind, topic, payload_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (id, value, created_at) in rows {
                let payload = serde_json::to_string(value)?;
                stmt.execute(rusqlite::params![
                    id,
                    kind,
                    topic,
                    payload,
                    created_at
                ])?;
            }
        }
        tx.commit()?;
        debug!(kind, topic, count = rows.len(), "Stored records");
        Ok(())
    }
}

impl ConfigStore for SqliteStore {
    fn load(&self) -> Result<SystemConfig, StoreError> {
        let stored = match self.get_setting(SYSTEM_CONFIG_KEY)? {
            Some(json) => serde_json::from_str::<SystemConfig>(&json)?,
            None => SystemConfig::default(),
        };
        Ok(stored.normalized())
    }

    fn save(&self, partial: &ConfigOverride) -> Result<SystemConfig, StoreError> {
        let merged = self.load()?.with_override(partial);
        self.put_setting(SYSTEM_CONFIG_KEY, &merged)?;
        Ok(merged)
    }
}

impl CredentialStore for SqliteStore {
    fn get(&self, provider: ProviderId) -> Result<Option<String>, StoreError> {
        match self.get_setting(&credential_key(provider))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set(&self, provider: ProviderId, key: &str) -> Result<(), StoreError> {
        self.put_setting(&credential_key(provider), &key.trim())
    }
}

impl RecordStore for SqliteStore {
    fn save_report(&self, report: &InvestigationReport) -> Result<(), StoreError> {
        let created_at = report
            .created_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        self.insert_records(
            kinds::REPORT,
            &report.topic,
            &[(report_key(&report.id.to_string()), report, created_at)],
        )
    }

    fn get_report(&self, id: &str) -> Result<Option<InvestigationReport>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT payload_json FROM records WHERE id = ?1 AND kind = ?2",
        )?;
        let payload: Option<String> = stmt
            .query_row(
                rusqlite::params![report_key(id), kinds::REPORT],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list_reports(&self, limit: usize) -> Result<Vec<InvestigationReport>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT payload_json FROM records WHERE kind = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;
        let payloads = stmt
            .query_map(rusqlite::params![kinds::REPORT, limit as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    fn save_feed_items(&self, topic: &str, items: &[FeedItem]) -> Result<(), StoreError> {
        let stamp = now_stamp();
        let rows: Vec<_> = items
            .iter()
            .map(|item| (fresh_key(kinds::FEED_ITEM), item, stamp.clone()))
            .collect();
        self.insert_records(kinds::FEED_ITEM, topic, &rows)
    }

    fn save_events(&self, topic: &str, events: &[MonitorEvent]) -> Result<(), StoreError> {
        let stamp = now_stamp();
        let rows: Vec<_> = events
            .iter()
            .map(|event| (fresh_key(kinds::MONITOR_EVENT), event, stamp.clone()))
            .collect();
        self.insert_records(kinds::MONITOR_EVENT, topic, &rows)
    }

    fn recent_event_contents(&self, topic: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT payload_json FROM records WHERE kind = ?1 AND topic = ?2 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?3",
        )?;
        let payloads = stmt
            .query_map(
                rusqlite::params![kinds::MONITOR_EVENT, topic, limit as i64],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|json| {
                serde_json::from_str::<MonitorEvent>(json)
                    .map(|event| event.content)
                    .map_err(StoreError::from)
            })
            .collect()
    }
}

fn report_key(id: &str) -> String {
    format!("{}:{id}", kinds::REPORT)
}

fn fresh_key(kind: &str) -> String {
    format!("{kind}:{}", Uuid::new_v4())
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use osint_models::{
        ConfigSnapshot, EventType, RiskLevel, SearchDepth, Sentiment, ThreatLevel,
    };

    fn make_report(topic: &str, age_minutes: i64) -> InvestigationReport {
        InvestigationReport {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            parent_topic: None,
            date_str: "October 18, 2026".to_string(),
            summary: "Summary".to_string(),
            entities: vec![],
            agendas: vec![],
            leads: vec!["Check filings".to_string()],
            sources: vec![],
            raw_text: "{}".to_string(),
            config: ConfigSnapshot {
                provider: ProviderId::Gemini,
                model_id: "gemini-2.5-flash".to_string(),
                persona: "Analyst".to_string(),
                search_depth: SearchDepth::Standard,
                thinking_budget: 0,
            },
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn make_event(id: &str, content: &str) -> MonitorEvent {
        MonitorEvent {
            id: id.to_string(),
            kind: EventType::News,
            source_name: "Wire".to_string(),
            content: content.to_string(),
            timestamp: "2026-10-18T09:00:00Z".to_string(),
            sentiment: Sentiment::Neutral,
            threat_level: ThreatLevel::Info,
            url: None,
        }
    }

    #[test]
    fn load_without_saved_config_returns_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load().unwrap(), SystemConfig::default());
    }

    #[test]
    fn save_merges_and_normalizes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = store
            .save(&ConfigOverride {
                provider: Some(ProviderId::OpenAi),
                model_id: Some("claude-3-opus-20240229".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(saved.model_id, "claude-sonnet-4-20250514");
        assert_eq!(saved.provider, ProviderId::Anthropic);

        let partial = store
            .save(&ConfigOverride {
                thinking_budget: Some(1024),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(partial.model_id, "claude-sonnet-4-20250514");
        assert_eq!(partial.thinking_budget, 1024);
        assert_eq!(store.load().unwrap(), partial);
    }

    #[test]
    fn load_remaps_legacy_rows_written_by_older_versions() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put_setting(
                SYSTEM_CONFIG_KEY,
                &serde_json::json!({"provider": "gemini", "modelId": "gpt-4"}),
            )
            .unwrap();
        let config = store.load().unwrap();
        assert_eq!(config.model_id, "gpt-4o");
        assert_eq!(config.provider, ProviderId::OpenAi);
    }

    #[test]
    fn credentials_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get(ProviderId::OpenRouter).unwrap(), None);
        store.set(ProviderId::OpenRouter, "  sk-or-abc  ").unwrap();
        assert_eq!(
            store.get(ProviderId::OpenRouter).unwrap().as_deref(),
            Some("sk-or-abc")
        );
        assert_eq!(store.get(ProviderId::OpenAi).unwrap(), None);
    }

    #[test]
    fn reports_listed_newest_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let older = make_report("older", 30);
        let newer = make_report("newer", 1);
        store.save_report(&older).unwrap();
        store.save_report(&newer).unwrap();

        let listed = store.list_reports(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].topic, "newer");
        assert_eq!(store.list_reports(1).unwrap().len(), 1);

        let fetched = store.get_report(&older.id.to_string()).unwrap().unwrap();
        assert_eq!(fetched, older);
        assert!(store.get_report("missing").unwrap().is_none());
    }

    #[test]
    fn event_contents_scoped_by_topic() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_events("port strike", &[make_event("e1", "Dockers walk out")])
            .unwrap();
        store
            .save_events("election", &[make_event("e2", "Polls open")])
            .unwrap();

        let contents = store.recent_event_contents("port strike", 10).unwrap();
        assert_eq!(contents, vec!["Dockers walk out".to_string()]);
    }

    #[test]
    fn repeated_upstream_ids_do_not_overwrite_earlier_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_events("port strike", &[make_event("1", "Dockers walk out")])
            .unwrap();
        store
            .save_events("port strike", &[make_event("1", "Cranes idle at berth 4")])
            .unwrap();
        store
            .save_events("election", &[make_event("1", "Polls open")])
            .unwrap();

        let contents = store.recent_event_contents("port strike", 10).unwrap();
        assert_eq!(
            contents,
            vec!["Cranes idle at berth 4".to_string(), "Dockers walk out".to_string()]
        );
        assert_eq!(store.recent_event_contents("election", 10).unwrap().len(), 1);
    }

    #[test]
    fn feed_items_do_not_collide_with_events() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_feed_items(
                "Baltics/Finance",
                &[FeedItem {
                    id: "x1".to_string(),
                    title: "Unusual transfer".to_string(),
                    category: "Finance".to_string(),
                    risk_level: RiskLevel::High,
                    timestamp: "2026-10-18T09:00:00Z".to_string(),
                }],
            )
            .unwrap();
        store
            .save_events("Baltics/Finance", &[make_event("x1", "Same id")])
            .unwrap();
        assert_eq!(
            store.recent_event_contents("Baltics/Finance", 5).unwrap().len(),
            1
        );
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osint.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set(ProviderId::Gemini, "AIzaTestKey").unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(ProviderId::Gemini).unwrap().as_deref(),
            Some("AIzaTestKey")
        );
    }
}
