use anyhow::Context;
use beacon_common::types::{ChannelRecord, ChannelType};
use beacon_notify::plugin::ChannelRegistry;
use beacon_storage::ChannelStore;
use chrono::Utc;

use crate::config::{ChannelsSeedFile, SeedChannel};

/// Validates a seed entry against the plugin for its type.
pub fn to_record(registry: &ChannelRegistry, seed: &SeedChannel) -> anyhow::Result<ChannelRecord> {
    let channel_type: ChannelType = seed
        .channel_type
        .parse()
        .map_err(|e| anyhow::anyhow!("channel '{}': {e}", seed.name))?;
    let plugin = registry
        .get_plugin(channel_type)
        .ok_or_else(|| anyhow::anyhow!("channel '{}': no plugin for '{channel_type}'", seed.name))?;
    plugin
        .validate_config(&seed.config)
        .with_context(|| format!("channel '{}'", seed.name))?;

    let now = Utc::now();
    Ok(ChannelRecord {
        id: String::new(),
        name: seed.name.clone(),
        channel_type,
        config: seed.config.clone(),
        enabled: seed.enabled,
        created_at: now,
        updated_at: now,
    })
}

/// Upserts channels by name. Entries with an invalid config are logged and
/// skipped. Returns the number written.
pub async fn init_channels(
    store: &dyn ChannelStore,
    registry: &ChannelRegistry,
    channels: &[SeedChannel],
) -> anyhow::Result<usize> {
    let mut written = 0usize;
    for seed in channels {
        let record = match to_record(registry, seed) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(name = %seed.name, error = %e, "Invalid notification channel, skipping");
                continue;
            }
        };
        let saved = store.upsert_channel_by_name(&record).await?;
        written += 1;
        tracing::info!(
            name = %saved.name,
            id = %saved.id,
            channel_type = %saved.channel_type,
            enabled = saved.enabled,
            "Notification channel saved"
        );
    }
    tracing::info!(written, total = channels.len(), "Notification channels initialized");
    Ok(written)
}

pub fn load_channels_seed(path: &str) -> anyhow::Result<ChannelsSeedFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file '{path}'"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse seed file '{path}'"))
}
