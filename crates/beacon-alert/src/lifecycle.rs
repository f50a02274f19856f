use beacon_common::clock::Clock;
use beacon_common::types::{Alert, AlertRule, AlertStatus};
use beacon_notify::NotificationDispatcher;
use beacon_storage::AlertStore;
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;

use crate::error::Result;

/// Owns the firing/resolved transitions of every rule's alerts.
///
/// State per rule: `no alert -> firing -> resolved -> firing -> ...`.
/// Cooldown is measured from the latest `fired_at` whatever its status.
pub struct AlertLifecycleManager {
    alerts: Arc<dyn AlertStore>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
}

impl AlertLifecycleManager {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            alerts,
            dispatcher,
            clock,
        }
    }

    /// True iff the rule's latest alert fired less than `cooldown_minutes` ago.
    pub async fn is_in_cooldown(&self, rule: &AlertRule) -> Result<bool> {
        let Some(latest) = self.alerts.latest_alert_for_rule(&rule.id).await? else {
            return Ok(false);
        };
        let cooldown = Duration::minutes(i64::from(rule.cooldown_minutes));
        Ok(self.clock.now() - latest.fired_at < cooldown)
    }

    /// Whether the rule currently has an unresolved alert.
    pub async fn has_firing_alert(&self, rule_id: &str) -> Result<bool> {
        Ok(!self.alerts.firing_alerts_for_rule(rule_id).await?.is_empty())
    }

    /// Persists a new firing alert and notifies the rule's channels.
    ///
    /// Callers must check [`Self::is_in_cooldown`] first. Per-channel delivery
    /// failures do not fail the fire; `notification_sent` is set once dispatch
    /// has run. Only a failed channel lookup leaves it unset.
    pub async fn fire(&self, rule: &AlertRule, current_value: f64) -> Result<Alert> {
        let now = self.clock.now();
        let mut alert = Alert {
            id: beacon_common::id::next_id(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            severity: rule.severity,
            message: format_message(rule, current_value),
            current_value,
            threshold: rule.threshold,
            status: AlertStatus::Firing,
            fired_at: now,
            resolved_at: None,
            notification_sent: false,
            metadata: json!({
                "description": rule.description,
                "evaluation_window_minutes": rule.evaluation_window_minutes,
                "metric": rule.metric,
                "condition": rule.condition.as_str(),
            }),
        };
        self.alerts.insert_alert(&alert).await?;
        tracing::warn!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            alert_id = %alert.id,
            severity = %rule.severity,
            value = current_value,
            threshold = rule.threshold,
            "Alert fired"
        );

        match self.dispatcher.dispatch(rule, &alert, now).await {
            Ok(report) => {
                if report.failed() > 0 {
                    tracing::warn!(
                        alert_id = %alert.id,
                        delivered = report.delivered(),
                        failed = report.failed(),
                        "Some notification channels failed"
                    );
                }
                if self.alerts.mark_notification_sent(&alert.id).await? {
                    alert.notification_sent = true;
                }
            }
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "Notification dispatch failed");
            }
        }

        Ok(alert)
    }

    /// Resolves every firing alert of the rule and returns how many changed.
    pub async fn resolve(&self, rule_id: &str) -> Result<usize> {
        let now = self.clock.now();
        let resolved = self.alerts.resolve_firing_alerts(rule_id, now).await?;
        if !resolved.is_empty() {
            tracing::info!(
                rule_id,
                count = resolved.len(),
                alert_ids = ?resolved,
                "Alerts resolved"
            );
        }
        Ok(resolved.len())
    }
}

/// `"error_rate is 0.1500, above threshold 0.1000"`
pub fn format_message(rule: &AlertRule, value: f64) -> String {
    format!(
        "{} is {:.4}, {} threshold {:.4}",
        rule.metric,
        value,
        rule.condition.describe(),
        rule.threshold
    )
}
