use crate::error::{NotifyError, Result};
use crate::plugin::ChannelRegistry;
use crate::{Notification, NotificationChannel};
use beacon_common::types::{Alert, AlertRule, ChannelRecord, ChannelType};
use beacon_storage::ChannelStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

/// Result of delivering one alert to one channel.
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_type: ChannelType,
    pub status: DeliveryStatus,
}

/// Per-channel outcomes of a single dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Fans an alert out to every enabled channel the rule names.
///
/// Channels are looked up on each dispatch so edits to channel records take
/// effect without a restart. Every delivery is bounded by `delivery_timeout`
/// and a failing channel never affects the others.
pub struct NotificationDispatcher {
    channels: Arc<dyn ChannelStore>,
    registry: ChannelRegistry,
    delivery_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(channels: Arc<dyn ChannelStore>, registry: ChannelRegistry) -> Self {
        Self {
            channels,
            registry,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Delivers `alert` to the rule's channels, sending at `now`.
    ///
    /// # Errors
    ///
    /// Only a failed channel lookup is returned as an error; per-channel
    /// delivery failures are recorded in the report.
    pub async fn dispatch(
        &self,
        rule: &AlertRule,
        alert: &Alert,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();
        if rule.notification_channels.is_empty() {
            tracing::debug!(rule_id = %rule.id, "Rule has no notification channels");
            return Ok(report);
        }

        let records = self
            .channels
            .list_enabled_channels(&rule.notification_channels)
            .await
            .map_err(|e| NotifyError::ChannelLookup(e.to_string()))?;

        if records.is_empty() {
            tracing::warn!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                "No enabled notification channels match rule"
            );
            return Ok(report);
        }

        let notification = Notification::new(alert.clone(), now);

        for record in &records {
            let status = match self.deliver_one(record, &notification).await {
                Ok(()) => {
                    tracing::info!(
                        alert_id = %alert.id,
                        channel_id = %record.id,
                        channel_name = %record.name,
                        channel_type = %record.channel_type,
                        "Notification delivered"
                    );
                    DeliveryStatus::Delivered
                }
                Err(e) => {
                    let config = self
                        .registry
                        .get_plugin(record.channel_type)
                        .map(|p| p.redact_config(&record.config))
                        .unwrap_or_default();
                    tracing::error!(
                        alert_id = %alert.id,
                        channel_id = %record.id,
                        channel_name = %record.name,
                        channel_type = %record.channel_type,
                        config = %config,
                        error = %e,
                        "Notification delivery failed"
                    );
                    DeliveryStatus::Failed(e.to_string())
                }
            };
            report.outcomes.push(ChannelOutcome {
                channel_id: record.id.clone(),
                channel_name: record.name.clone(),
                channel_type: record.channel_type,
                status,
            });
        }

        Ok(report)
    }

    async fn deliver_one(&self, record: &ChannelRecord, notification: &Notification) -> Result<()> {
        let channel: Box<dyn NotificationChannel> =
            self.registry
                .create_channel(record.channel_type, &record.id, &record.config)?;
        tokio::time::timeout(self.delivery_timeout, channel.deliver(notification))
            .await
            .map_err(|_| NotifyError::Timeout(self.delivery_timeout))?
    }
}
