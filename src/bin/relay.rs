use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use metrics_relay::{
    actors::{SchedulerHandle, SchedulerSettings},
    api::{ApiConfig, ApiState, spawn_api_server},
    catalog::{CatalogDiscovery, MetricCatalog},
    config::{Config, StorageConfig, read_config_file},
    publisher::FanoutPublisher,
    registry::ApplicationRegistry,
    service::MetricsService,
    storage::{CatalogStore, RegistryStore, memory::MemoryStore},
    upstream::{HttpUpstream, UpstreamClient},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![("metrics_relay", LevelFilter::TRACE)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let (registry_store, catalog_store) = open_stores(&config).await?;

    let upstream: Arc<dyn UpstreamClient> = Arc::new(
        HttpUpstream::new(&config.upstream).context("invalid upstream configuration")?,
    );
    let publisher =
        FanoutPublisher::from_config(&config.publisher).context("invalid publisher configuration")?;
    let catalog = MetricCatalog::new(catalog_store);
    let service = MetricsService::new(
        upstream.clone(),
        ApplicationRegistry::new(registry_store, upstream.clone()),
        catalog.clone(),
        CatalogDiscovery::new(upstream, catalog, config.discovery.concurrency),
        publisher,
    );

    let scheduler = SchedulerHandle::spawn(
        service.clone(),
        SchedulerSettings::from(&config.scheduler),
    );

    let addr = spawn_api_server(
        ApiConfig::from(&config.api),
        ApiState::new(service, Some(scheduler.clone())),
    )
    .await?;
    info!("relay ready, API on {addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    scheduler.shutdown().await?;

    Ok(())
}

async fn open_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn RegistryStore>, Arc<dyn CatalogStore>)> {
    match config.storage.clone().unwrap_or_default() {
        StorageConfig::None => {
            info!("using in-memory store");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            let store = Arc::new(
                metrics_relay::storage::sqlite::SqliteStore::new(&path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?,
            );
            Ok((store.clone(), store))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requested but the storage-sqlite feature is disabled")
        }
    }
}
