use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use osint_agents::keys::{is_valid_shape, key_prefix};
use osint_models::scope::{find_preset, presets};
use osint_models::{
    ConfigOverride, DateRange, InvestigateRequest, InvestigationScope, LiveIntelRequest,
    MonitorConfig, ParentContext, ProviderId, ScanOptions, ScanRequest, SearchDepth,
};
use osint_store::{ConfigStore, CredentialStore, RecordStore, SqliteStore};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How many previously seen events are sent upstream for live-intel dedupe.
const EXISTING_CONTENT_LIMIT: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "osint", about = "OSINT Investigation Assistant")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/osint.toml")]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Investigate a topic and store the report
    Investigate {
        topic: String,
        /// Topic of the investigation this one follows up on
        #[arg(long, requires = "parent_summary")]
        parent_topic: Option<String>,
        #[arg(long, requires = "parent_topic")]
        parent_summary: Option<String>,
        /// Date the report is written for, instead of today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Scan a region for anomalies in a category
    Scan {
        region: String,
        category: String,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[arg(long, default_value_t = 6)]
        limit: usize,
        #[arg(long = "priority-source")]
        priority_sources: Vec<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Fetch live intelligence on a topic, skipping items already stored
    Live {
        topic: String,
        #[arg(long, default_value_t = 3)]
        social: u32,
        #[arg(long, default_value_t = 3)]
        news: u32,
        #[arg(long, default_value_t = 2)]
        official: u32,
        #[arg(long = "priority-source")]
        priority_sources: Vec<String>,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Synthesize an audio briefing and write it to a file
    Speak {
        text: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        model: Option<String>,
    },
    /// Show or change the stored system configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage provider API keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Browse stored investigation reports
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },
    /// List the built-in investigation scopes
    Scopes,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        provider: Option<ProviderId>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        persona: Option<String>,
        #[arg(long)]
        depth: Option<SearchDepth>,
        #[arg(long)]
        thinking_budget: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    Set { provider: ProviderId, key: String },
}

#[derive(Subcommand, Debug)]
enum ReportsAction {
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Show { id: String },
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

fn resolve_scope(id: Option<&str>) -> Result<Option<InvestigationScope>> {
    let Some(id) = id else {
        return Ok(None);
    };
    match find_preset(id) {
        Some(scope) => Ok(Some(scope)),
        None => {
            let known: Vec<_> = presets().into_iter().map(|s| s.id).collect();
            bail!("Unknown scope '{id}'. Known scopes: {}", known.join(", "))
        }
    }
}

fn model_override(model: Option<String>) -> ConfigOverride {
    ConfigOverride {
        model_id: model,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    init_tracing(cli.log_json);

    let config = osint::load_config(&cli.config)?;
    let store: Arc<SqliteStore> = osint::open_store(&config)?;

    match cli.command {
        Command::Investigate {
            topic,
            parent_topic,
            parent_summary,
            date,
            scope,
            model,
        } => {
            let router = osint::build_router(&config, store.clone());
            let request = InvestigateRequest {
                topic,
                parent: parent_topic
                    .zip(parent_summary)
                    .map(|(topic, summary)| ParentContext { topic, summary }),
                scope: resolve_scope(scope.as_deref())?,
                date_override: date,
            };
            let report = router
                .investigate(request, &model_override(model))
                .await
                .context("Investigation failed")?;
            store.save_report(&report).context("Failed to store report")?;
            info!(id = %report.id, "report stored");
            print_json(&report, cli.pretty)?;
        }
        Command::Scan {
            region,
            category,
            from,
            to,
            limit,
            priority_sources,
            scope,
            model,
        } => {
            let router = osint::build_router(&config, store.clone());
            let request = ScanRequest {
                date_range: from.zip(to).map(|(start, end)| DateRange { start, end }),
                scope: resolve_scope(scope.as_deref())?,
                options: ScanOptions {
                    limit,
                    priority_sources,
                },
                ..ScanRequest::new(region.clone(), category)
            };
            let items = router
                .scan_anomalies(request, &model_override(model))
                .await
                .context("Anomaly scan failed")?;
            if items.iter().any(|i| i.is_fallback()) {
                warn!("scan returned placeholder items; upstream was unavailable");
            } else {
                store
                    .save_feed_items(&region, &items)
                    .context("Failed to store feed items")?;
            }
            print_json(&items, cli.pretty)?;
        }
        Command::Live {
            topic,
            social,
            news,
            official,
            priority_sources,
            scope,
            model,
        } => {
            let router = osint::build_router(&config, store.clone());
            let existing_content = store
                .recent_event_contents(&topic, EXISTING_CONTENT_LIMIT)
                .context("Failed to read stored events")?;
            let request = LiveIntelRequest {
                topic: topic.clone(),
                scope: resolve_scope(scope.as_deref())?,
                monitor: Some(MonitorConfig {
                    social_count: social,
                    news_count: news,
                    official_count: official,
                    priority_sources,
                }),
                existing_content,
            };
            let events = router
                .live_intel(request, &model_override(model))
                .await
                .context("Live intel failed")?;
            if events.iter().any(|e| e.is_fallback()) {
                warn!("live intel returned placeholder events; upstream was unavailable");
            } else {
                store
                    .save_events(&topic, &events)
                    .context("Failed to store events")?;
            }
            print_json(&events, cli.pretty)?;
        }
        Command::Speak { text, out, model } => {
            let router = osint::build_router(&config, store.clone());
            let audio = router
                .audio_briefing(text, &model_override(model))
                .await
                .context("Audio briefing failed")?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(audio.trim())
                .context("Upstream audio was not valid base64")?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("Failed to write audio: {}", out.display()))?;
            info!(path = %out.display(), bytes = bytes.len(), "audio briefing written");
        }
        Command::Config { action } => match action {
            ConfigAction::Show => print_json(&store.load()?, cli.pretty)?,
            ConfigAction::Set {
                provider,
                model,
                persona,
                depth,
                thinking_budget,
            } => {
                let partial = ConfigOverride {
                    provider,
                    model_id: model,
                    persona,
                    search_depth: depth,
                    thinking_budget,
                };
                if partial.is_empty() {
                    bail!("Nothing to set; pass at least one of --provider, --model, --persona, --depth, --thinking-budget");
                }
                let saved = store.save(&partial).context("Failed to save configuration")?;
                print_json(&saved, cli.pretty)?;
            }
        },
        Command::Key {
            action: KeyAction::Set { provider, key },
        } => {
            let key = key.trim();
            if !is_valid_shape(provider, key) {
                warn!(
                    provider = %provider,
                    expected_prefix = key_prefix(provider),
                    "key does not look like a {provider} key; storing it anyway"
                );
            }
            store.set(provider, key).context("Failed to store key")?;
            eprintln!("Stored {provider} key");
        }
        Command::Reports { action } => match action {
            ReportsAction::List { limit } => {
                print_json(&store.list_reports(limit)?, cli.pretty)?;
            }
            ReportsAction::Show { id } => match store.get_report(&id)? {
                Some(report) => print_json(&report, cli.pretty)?,
                None => bail!("No report with id {id}"),
            },
        },
        Command::Scopes => print_json(&presets(), cli.pretty)?,
    }

    Ok(())
}
