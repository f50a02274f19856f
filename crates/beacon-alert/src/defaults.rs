use beacon_common::types::{AlertRule, ChannelType, Condition, Severity};
use beacon_storage::RuleStore;
use chrono::Utc;

use crate::error::Result;

/// Built-in rule definitions, seeded by name on every start.
struct RuleDef {
    name: &'static str,
    description: &'static str,
    metric: &'static str,
    condition: &'static str,
    threshold: f64,
    severity: Severity,
    cooldown_minutes: u32,
    channels: &'static [ChannelType],
    query: &'static str,
    evaluation_window_minutes: u32,
}

const CRITICAL_CHANNELS: &[ChannelType] = &[
    ChannelType::Webhook,
    ChannelType::Slack,
    ChannelType::Email,
    ChannelType::Sms,
];
const WARNING_CHANNELS: &[ChannelType] = &[ChannelType::Webhook, ChannelType::Slack];
const INFO_CHANNELS: &[ChannelType] = &[ChannelType::Email];

const DEFAULT_RULES: &[RuleDef] = &[
    RuleDef {
        name: "High Error Rate",
        description: "Share of API requests answered with a 5xx status",
        metric: "error_rate",
        condition: "greater_than",
        threshold: 0.1,
        severity: Severity::Critical,
        cooldown_minutes: 5,
        channels: CRITICAL_CHANNELS,
        query: "SELECT CAST(SUM(CASE WHEN status >= 500 THEN 1 ELSE 0 END) AS REAL) \
                / MAX(COUNT(*), 1) AS error_rate \
                FROM requests WHERE ts >= unixepoch('now', '-5 minutes')",
        evaluation_window_minutes: 5,
    },
    RuleDef {
        name: "Slow Listing Search",
        description: "95th percentile latency of listing search requests",
        metric: "p95_latency_ms",
        condition: "greater_than",
        threshold: 1500.0,
        severity: Severity::Warning,
        cooldown_minutes: 15,
        channels: WARNING_CHANNELS,
        query: "SELECT latency_ms AS p95_latency_ms FROM requests \
                WHERE route = '/search' AND ts >= unixepoch('now', '-15 minutes') \
                ORDER BY latency_ms DESC \
                LIMIT 1 OFFSET (SELECT COUNT(*) / 20 FROM requests \
                WHERE route = '/search' AND ts >= unixepoch('now', '-15 minutes'))",
        evaluation_window_minutes: 15,
    },
    RuleDef {
        name: "Crawler Failure Spike",
        description: "Failed crawl runs in the last half hour",
        metric: "failed_crawls",
        condition: "greater_than",
        threshold: 10.0,
        severity: Severity::Warning,
        cooldown_minutes: 30,
        channels: WARNING_CHANNELS,
        query: "SELECT COUNT(*) AS failed_crawls FROM crawl_runs \
                WHERE succeeded = 0 AND ts >= unixepoch('now', '-30 minutes')",
        evaluation_window_minutes: 30,
    },
    RuleDef {
        name: "Stale Listings",
        description: "Share of listings not re-crawled within a week",
        metric: "stale_ratio",
        condition: "greater_than",
        threshold: 0.25,
        severity: Severity::Info,
        cooldown_minutes: 720,
        channels: INFO_CHANNELS,
        query: "SELECT CAST(SUM(CASE WHEN last_crawled_at < unixepoch('now', '-7 days') \
                THEN 1 ELSE 0 END) AS REAL) / MAX(COUNT(*), 1) AS stale_ratio FROM listings",
        evaluation_window_minutes: 10080,
    },
    RuleDef {
        name: "Publishing Queue Backlog",
        description: "Listing claims waiting for review",
        metric: "pending_claims",
        condition: "greater_than",
        threshold: 50.0,
        severity: Severity::Warning,
        cooldown_minutes: 60,
        channels: WARNING_CHANNELS,
        query: "SELECT COUNT(*) AS pending_claims FROM claims WHERE status = 'pending'",
        evaluation_window_minutes: 60,
    },
];

/// The built-in rule set, enabled, with IDs left for the store to assign.
pub fn default_rules() -> Vec<AlertRule> {
    let now = Utc::now();
    DEFAULT_RULES
        .iter()
        .map(|def| AlertRule {
            id: String::new(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            metric: def.metric.to_string(),
            condition: Condition::parse(def.condition),
            threshold: def.threshold,
            severity: def.severity,
            enabled: true,
            cooldown_minutes: def.cooldown_minutes,
            notification_channels: def.channels.to_vec(),
            query: def.query.to_string(),
            evaluation_window_minutes: def.evaluation_window_minutes,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Upserts `rules` by name. Returns how many were written.
///
/// A rule that fails to save is logged and skipped.
pub async fn seed_rules(store: &dyn RuleStore, rules: &[AlertRule]) -> Result<usize> {
    let mut seeded = 0usize;
    for rule in rules {
        match store.upsert_by_name(rule).await {
            Ok(saved) => {
                seeded += 1;
                tracing::debug!(rule_id = %saved.id, name = %saved.name, "Seeded alert rule");
            }
            Err(e) => {
                tracing::warn!(name = %rule.name, error = %e, "Failed to seed alert rule");
            }
        }
    }
    tracing::info!(seeded, total = rules.len(), "Alert rules seeded");
    Ok(seeded)
}

/// Seeds the built-in rules. An existing rule keeps its `enabled` flag so a
/// disabled default stays disabled across restarts.
pub async fn seed_default_rules(store: &dyn RuleStore) -> Result<usize> {
    let existing = store.list_all().await?;
    let mut rules = default_rules();
    for rule in &mut rules {
        if let Some(prev) = existing.iter().find(|r| r.name == rule.name) {
            rule.enabled = prev.enabled;
        }
    }
    seed_rules(store, &rules).await
}
