pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use osint_models::{
    ConfigOverride, FeedItem, InvestigationReport, MonitorEvent, ProviderId, SystemConfig,
};

/// Persisted pipeline configuration. Implementations normalize on every load and save
/// so legacy model ids and provider/model mismatches never escape the store.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<SystemConfig, StoreError>;
    fn save(&self, partial: &ConfigOverride) -> Result<SystemConfig, StoreError>;
}

/// Locally stored provider credentials. Reads never write.
pub trait CredentialStore: Send + Sync {
    fn get(&self, provider: ProviderId) -> Result<Option<String>, StoreError>;
    fn set(&self, provider: ProviderId, key: &str) -> Result<(), StoreError>;
}

/// Storage for finished pipeline results.
pub trait RecordStore: Send + Sync {
    fn save_report(&self, report: &InvestigationReport) -> Result<(), StoreError>;
    fn get_report(&self, id: &str) -> Result<Option<InvestigationReport>, StoreError>;
    /// Most recent first.
    fn list_reports(&self, limit: usize) -> Result<Vec<InvestigationReport>, StoreError>;
    fn save_feed_items(&self, topic: &str, items: &[FeedItem]) -> Result<(), StoreError>;
    fn save_events(&self, topic: &str, events: &[MonitorEvent]) -> Result<(), StoreError>;
    /// Content of the most recent events stored for a topic, newest first.
    fn recent_event_contents(&self, topic: &str, limit: usize) -> Result<Vec<String>, StoreError>;
}
