use anyhow::Context;
use beacon_common::types::{AlertRule, ChannelType, Condition, Severity};
use beacon_storage::RuleStore;
use chrono::Utc;

use crate::config::{RulesSeedFile, SeedAlertRule};

/// Converts a seed entry into a rule. Unknown channel names are dropped with a
/// warning; an unknown condition or severity is an error.
pub fn to_rule(seed: &SeedAlertRule) -> anyhow::Result<AlertRule> {
    let condition = Condition::parse(&seed.condition);
    if let Condition::Unknown(raw) = &condition {
        anyhow::bail!("rule '{}': unknown condition '{raw}'", seed.name);
    }
    let severity: Severity = seed
        .severity
        .parse()
        .map_err(|e| anyhow::anyhow!("rule '{}': {e}", seed.name))?;

    let mut notification_channels = Vec::with_capacity(seed.notification_channels.len());
    for name in &seed.notification_channels {
        match name.parse::<ChannelType>() {
            Ok(ty) => notification_channels.push(ty),
            Err(e) => tracing::warn!(rule = %seed.name, error = %e, "Ignoring channel type"),
        }
    }

    let now = Utc::now();
    Ok(AlertRule {
        id: String::new(),
        name: seed.name.clone(),
        description: seed.description.clone(),
        metric: seed.metric.clone(),
        condition,
        threshold: seed.threshold,
        severity,
        enabled: seed.enabled,
        cooldown_minutes: seed.cooldown_minutes,
        notification_channels,
        query: seed.query.clone(),
        evaluation_window_minutes: seed.evaluation_window_minutes,
        created_at: now,
        updated_at: now,
    })
}

/// Upserts every valid rule of the seed file by name. Invalid entries are
/// logged and skipped. Returns the number written.
pub async fn init_rules_from_seed(store: &dyn RuleStore, seed: &RulesSeedFile) -> anyhow::Result<usize> {
    let mut rules = Vec::with_capacity(seed.rules.len());
    for entry in &seed.rules {
        match to_rule(entry) {
            Ok(rule) => rules.push(rule),
            Err(e) => tracing::error!(name = %entry.name, error = %e, "Invalid rule in seed file"),
        }
    }
    let written = beacon_alert::defaults::seed_rules(store, &rules).await?;
    Ok(written)
}

pub fn load_rules_seed(path: &str) -> anyhow::Result<RulesSeedFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file '{path}'"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse seed file '{path}'"))
}
