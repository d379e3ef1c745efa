pub mod catalog;
pub mod config;
pub mod feed;
pub mod provider;
pub mod report;
pub mod request;
pub mod scope;

pub use config::{
    ConfigOverride, EndpointsConfig, OsintConfig, RetryConfig, SearchDepth, StoreConfig,
    SystemConfig,
};
pub use feed::{EventType, FeedItem, MonitorEvent, RiskLevel, ThreatLevel, FALLBACK_ID_PREFIX};
pub use provider::{Operation, ProviderId};
pub use report::{
    ConfigSnapshot, Entity, EntityType, InvestigationReport, Sentiment, Source, EMPTY_SUMMARY,
    UNTITLED_SOURCE,
};
pub use request::{
    InvestigateRequest, LiveIntelRequest, MonitorConfig, ParentContext, ScanOptions, ScanRequest,
};
pub use scope::{DateRange, InvestigationScope, OPEN_INVESTIGATION_ID};
