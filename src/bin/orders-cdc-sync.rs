//! # Orders CDC Sync
//!
//! Applies one change-stream batch to the order database. The batch is read
//! as stream-event JSON from a file or stdin; connection parameters and
//! credentials come from a local JSON store file keyed by the names held in
//! the resolver's environment variables.

use anyhow::{Context, Result};
use clap::Parser;
use orders_cdc::config::{ConfigLoader, SyncConfig};
use orders_cdc::database::{DatabaseSettings, OrderDatabase};
use orders_cdc::logging::{init_structured_logging, log_error};
use orders_cdc::models::StreamEvent;
use orders_cdc::resolver::{ConnectionResolver, JsonFileConnector, TtlCache};
use orders_cdc::sync::{
    BackoffPolicy, BatchProcessor, OrderSchema, RecordConverter, UpsertController,
};
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "orders-cdc-sync")]
#[command(about = "Apply an order change-stream batch to the relational order table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Stream event JSON file (reads stdin when omitted)
    #[arg(short, long)]
    event: Option<PathBuf>,

    /// TOML configuration layered over the built-in defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file serving as the parameter and secret store
    #[arg(short, long, default_value = "stores.json")]
    stores: PathBuf,
}

#[tokio::main]
async fn main() {
    init_structured_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(clean) => {
            if !clean {
                process::exit(2);
            }
        }
        Err(err) => {
            log_error("orders-cdc-sync", "run", &format!("{err:#}"), None);
            eprintln!("❌ {err:#}");
            process::exit(1);
        }
    }
}

/// Returns whether every record was applied
async fn run(cli: Cli) -> Result<bool> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().context("loading configuration")?;

    let event = read_event(cli.event.as_ref()).await?;
    let records = event.into_change_records();

    let cache = Arc::new(TtlCache::from_config(&config.cache));
    let _sweeper = cache.spawn_sweeper();
    let resolver = ConnectionResolver::new(
        config.resolver.clone(),
        cache,
        Arc::new(JsonFileConnector::new(&cli.stores)),
    );

    let connection = resolver
        .resolve_connection_config()
        .await
        .context("resolving connection parameters")?;
    let credentials = resolver
        .resolve_credentials()
        .await
        .context("resolving credentials")?;

    let database = OrderDatabase::connect(
        &connection,
        &credentials,
        &DatabaseSettings::from(&config.database),
    )
    .await
    .context("connecting to the order database")?;

    let processor = build_processor(&config, &database);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling batch");
            on_signal.cancel();
        }
    });

    let outcome = processor.process_batch(&records, &cancel).await;
    database.close().await;

    let report = outcome.context("processing change batch")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(batch_id = %report.batch_id, clean = report.is_clean(), "Batch complete");
    Ok(report.is_clean())
}

fn build_processor(config: &SyncConfig, database: &OrderDatabase) -> BatchProcessor {
    let converter =
        RecordConverter::new(OrderSchema::with_primary_key(&config.sync.primary_key_attribute));
    let controller = UpsertController::new(database.order_table(), database.error_classifier())
        .with_converter(converter)
        .with_backoff(BackoffPolicy::new(config.sync.backoff_unit()))
        .with_max_attempts(config.sync.max_attempts);
    BatchProcessor::new(controller, config.sync.batch_failure_policy)
}

async fn read_event(path: Option<&PathBuf>) -> Result<StreamEvent> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading event file {}", path.display()))?,
        None => tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map(|_| buffer)
        })
        .await?
        .context("reading event from stdin")?,
    };
    serde_json::from_str(&raw).context("parsing stream event")
}
