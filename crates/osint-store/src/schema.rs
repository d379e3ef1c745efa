/// Tables owned by the local store.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS settings (
///     key         TEXT PRIMARY KEY,
///     value_json  TEXT NOT NULL,
///     updated_at  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS records (
///     id            TEXT PRIMARY KEY,
///     kind          TEXT NOT NULL,
///     topic         TEXT NOT NULL,
///     payload_json  TEXT NOT NULL,
///     created_at    TEXT NOT NULL
/// );
/// ```
pub const STORE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS settings (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS records (
    id            TEXT PRIMARY KEY,
    kind          TEXT NOT NULL,
    topic         TEXT NOT NULL,
    payload_json  TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind, created_at);
CREATE INDEX IF NOT EXISTS idx_records_topic ON records(topic);
";

/// Settings key holding the serialized `SystemConfig`.
pub const SYSTEM_CONFIG_KEY: &str = "system_config";

/// Record kinds written to the `records` table.
pub mod kinds {
    pub const REPORT: &str = "report";
    pub const FEED_ITEM: &str = "feed_item";
    pub const MONITOR_EVENT: &str = "monitor_event";
}

/// Settings key for a provider credential: `credential:{provider}`.
pub fn credential_key(provider: osint_models::ProviderId) -> String {
    format!("credential:{provider}")
}
