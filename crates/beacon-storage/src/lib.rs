//! Persistence contracts for the alerting engine and their backends.
//!
//! Three record sets back the engine: `alert_rules`, `alerts` and
//! `notification_channels`. The engine only talks to them through the
//! [`RuleStore`], [`AlertStore`] and [`ChannelStore`] traits; the default
//! implementation ([`store::Store`]) uses SeaORM over SQLite, and
//! [`memory::MemoryStore`] keeps everything in process.
//!
//! Telemetry is read through [`telemetry::MetricQueryExecutor`], which runs a
//! rule's opaque query string against a SQLite database or an HTTP endpoint.

pub mod entities;
pub mod error;
pub mod memory;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use beacon_common::types::{Alert, AlertRule, ChannelRecord, ChannelType};
use chrono::{DateTime, Utc};

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use store::Store;

/// Access to alert rule definitions.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Returns every rule with `enabled = true`.
    async fn list_enabled(&self) -> Result<Vec<AlertRule>>;

    /// Returns every rule, enabled or not.
    async fn list_all(&self) -> Result<Vec<AlertRule>>;

    /// Updates the rule with the same name, or inserts it when none exists.
    ///
    /// An existing record keeps its `id` and `created_at`. A new record uses
    /// `rule.id`, or a freshly generated ID when that is empty.
    async fn upsert_by_name(&self, rule: &AlertRule) -> Result<AlertRule>;

    async fn get_by_id(&self, id: &str) -> Result<Option<AlertRule>>;

    /// Enables or disables a rule. Rules are never hard-deleted.
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Option<AlertRule>>;
}

/// Persistence of alert instances.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// The alert with the greatest `fired_at` for this rule, regardless of status.
    async fn latest_alert_for_rule(&self, rule_id: &str) -> Result<Option<Alert>>;

    async fn firing_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>>;

    /// Marks every firing alert of the rule as resolved at `resolved_at`.
    /// Returns the IDs of the alerts that changed.
    async fn resolve_firing_alerts(
        &self,
        rule_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<Vec<String>>;

    /// Sets `notification_sent = true`. Returns false if the alert does not exist.
    async fn mark_notification_sent(&self, alert_id: &str) -> Result<bool>;

    /// All alerts of a rule, newest first.
    async fn list_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>>;
}

/// Access to configured notification channels.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Enabled channels whose type is one of `types`.
    async fn list_enabled_channels(&self, types: &[ChannelType]) -> Result<Vec<ChannelRecord>>;

    /// Updates the channel with the same name, or inserts it when none exists.
    async fn upsert_channel_by_name(&self, channel: &ChannelRecord) -> Result<ChannelRecord>;
}

pub(crate) fn channels_to_json(channels: &[ChannelType]) -> Result<String> {
    let mut names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    Ok(serde_json::to_string(&names)?)
}

/// Decodes a JSON array of channel type names, dropping names that no
/// channel implementation exists for.
pub(crate) fn channels_from_json(rule_id: &str, raw: &str) -> Result<Vec<ChannelType>> {
    let names: Vec<String> = serde_json::from_str(raw)?;
    let mut channels = Vec::with_capacity(names.len());
    for name in names {
        match name.parse::<ChannelType>() {
            Ok(ty) if !channels.contains(&ty) => channels.push(ty),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(rule_id, channel = %name, error = %e, "Ignoring unknown notification channel type");
            }
        }
    }
    Ok(channels)
}
