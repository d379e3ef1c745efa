use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use osint_models::{
    ConfigOverride, FeedItem, InvestigationReport, MonitorEvent, ProviderId, SystemConfig,
};

use crate::error::StoreError;
use crate::{ConfigStore, CredentialStore, RecordStore};

/// Process-local store with the same semantics as `SqliteStore`.
///
/// Nothing survives the process. Used by tests and by `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    config: Option<SystemConfig>,
    credentials: HashMap<ProviderId, String>,
    reports: Vec<InvestigationReport>,
    feed_items: Vec<(String, FeedItem)>,
    events: Vec<(String, MonitorEvent)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a stored config row, exactly as if an older version had written it.
    pub fn with_config(config: SystemConfig) -> Self {
        let store = Self::default();
        if let Ok(mut inner) = store.inner.lock() {
            inner.config = Some(config);
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory store mutex poisoned: {e}")))
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<SystemConfig, StoreError> {
        let inner = self.lock()?;
        Ok(inner.config.clone().unwrap_or_default().normalized())
    }

    fn save(&self, partial: &ConfigOverride) -> Result<SystemConfig, StoreError> {
        let mut inner = self.lock()?;
        let merged = inner
            .config
            .clone()
            .unwrap_or_default()
            .normalized()
            .with_override(partial);
        inner.config = Some(merged.clone());
        Ok(merged)
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, provider: ProviderId) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.credentials.get(&provider).cloned())
    }

    fn set(&self, provider: ProviderId, key: &str) -> Result<(), StoreError> {
        self.lock()?
            .credentials
            .insert(provider, key.trim().to_string());
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn save_report(&self, report: &InvestigationReport) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.reports.retain(|r| r.id != report.id);
        inner.reports.push(report.clone());
        Ok(())
    }

    fn get_report(&self, id: &str) -> Result<Option<InvestigationReport>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .reports
            .iter()
            .find(|r| r.id.to_string() == id)
            .cloned())
    }

    fn list_reports(&self, limit: usize) -> Result<Vec<InvestigationReport>, StoreError> {
        let inner = self.lock()?;
        let mut reports = inner.reports.clone();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reports.truncate(limit);
        Ok(reports)
    }

    fn save_feed_items(&self, topic: &str, items: &[FeedItem]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .feed_items
            .extend(items.iter().map(|i| (topic.to_string(), i.clone())));
        Ok(())
    }

    fn save_events(&self, topic: &str, events: &[MonitorEvent]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner
            .events
            .extend(events.iter().map(|e| (topic.to_string(), e.clone())));
        Ok(())
    }

    fn recent_event_contents(&self, topic: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|(t, _)| t == topic)
            .take(limit)
            .map(|(_, e)| e.content.clone())
            .collect())
    }
}
