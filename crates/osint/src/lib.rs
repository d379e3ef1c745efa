//! OSINT Investigation Assistant
//!
//! Runs investigations, anomaly scans, live-intel sweeps and audio briefings
//! against Gemini, OpenAI, Anthropic or OpenRouter, normalizing whatever the
//! model returns into stable report, feed and event contracts.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use osint::models::{ConfigOverride, InvestigateRequest, OsintConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = OsintConfig::default();
//! let store = osint::open_store(&config)?;
//! let router = osint::build_router(&config, store);
//! let report = router
//!     .investigate(InvestigateRequest::new("Atlas Holdings"), &ConfigOverride::default())
//!     .await?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

pub use osint_agents as agents;
pub use osint_models as models;
pub use osint_store as store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use osint_agents::{default_adapters, KeyStore, ReqwestTransport, RetryPolicy, Router};
use osint_models::OsintConfig;
use osint_store::SqliteStore;
use tracing::info;

/// Read the app config. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<OsintConfig, anyhow::Error> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(OsintConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Open the SQLite store named by the config, creating its directory if needed.
pub fn open_store(config: &OsintConfig) -> Result<Arc<SqliteStore>, anyhow::Error> {
    let path = Path::new(&config.store.sqlite_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open store: {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Build a router over the real HTTP transport, backed by `store` for
/// configuration and credentials.
pub fn build_router(config: &OsintConfig, store: Arc<SqliteStore>) -> Router {
    let keys = KeyStore::new(store.clone());
    let adapters = default_adapters(
        &keys,
        Arc::new(ReqwestTransport::new()),
        &config.endpoints,
        &RetryPolicy::from(&config.retry),
    );
    Router::new(store, adapters)
}
