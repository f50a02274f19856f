use anyhow::Context;
use beacon_alert::{AlertEngine, AlertLifecycleManager, EngineConfig, SchedulerConfig};
use beacon_common::clock::{Clock, SystemClock};
use beacon_notify::plugin::ChannelRegistry;
use beacon_notify::NotificationDispatcher;
use beacon_storage::telemetry::{HttpQueryExecutor, MetricQueryExecutor, SqliteQueryExecutor};
use beacon_storage::Store;
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, ServerConfig, TelemetryBackend, TelemetryConfig};

/// Everything the engine needs, wired from one config.
pub struct App {
    pub store: Arc<Store>,
    pub engine: Arc<AlertEngine>,
    pub scheduler: SchedulerConfig,
}

pub async fn open_store(config: &DatabaseConfig) -> anyhow::Result<Store> {
    if config.url.is_none() {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data dir '{}'", config.data_dir))?;
    }
    Ok(Store::connect(&config.connection_url()).await?)
}

pub fn build_executor(config: &TelemetryConfig) -> anyhow::Result<Arc<dyn MetricQueryExecutor>> {
    match config.backend {
        TelemetryBackend::Sqlite => {
            let executor = SqliteQueryExecutor::open_read_only(Path::new(&config.path))
                .with_context(|| format!("Failed to open telemetry database '{}'", config.path))?;
            tracing::info!(path = %config.path, "Using SQLite telemetry backend");
            Ok(Arc::new(executor))
        }
        TelemetryBackend::Http => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("telemetry.url is required for the http backend"))?;
            tracing::info!(url = %url, "Using HTTP telemetry backend");
            Ok(Arc::new(HttpQueryExecutor::new(url, config.api_key.clone())))
        }
    }
}

/// Opens the store, applies the configured channels and assembles the engine.
pub async fn build(config: &ServerConfig) -> anyhow::Result<App> {
    let store = Arc::new(open_store(&config.database).await?);
    let executor = build_executor(&config.telemetry)?;
    build_with(config, store, executor, Arc::new(SystemClock)).await
}

pub async fn build_with(
    config: &ServerConfig,
    store: Arc<Store>,
    executor: Arc<dyn MetricQueryExecutor>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<App> {
    let registry = ChannelRegistry::default();
    if !config.channels.is_empty() {
        crate::channel_seed::init_channels(store.as_ref(), &registry, &config.channels).await?;
    }

    let dispatcher = Arc::new(
        NotificationDispatcher::new(store.clone(), registry)
            .with_delivery_timeout(config.evaluation.delivery_timeout()),
    );
    let lifecycle = AlertLifecycleManager::new(store.clone(), dispatcher, clock);
    let engine = Arc::new(AlertEngine::new(
        store.clone(),
        executor,
        lifecycle,
        EngineConfig {
            query_timeout: config.evaluation.query_timeout(),
        },
    ));

    Ok(App {
        store,
        engine,
        scheduler: SchedulerConfig {
            interval: config.evaluation.interval(),
            seed_default_rules: config.evaluation.seed_default_rules,
        },
    })
}
