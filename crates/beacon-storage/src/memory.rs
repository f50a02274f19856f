use async_trait::async_trait;
use beacon_common::types::{Alert, AlertRule, AlertStatus, ChannelRecord, ChannelType};
use chrono::{DateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::{AlertStore, ChannelStore, RuleStore};

#[derive(Default)]
struct Inner {
    rules: Vec<AlertRule>,
    alerts: Vec<Alert>,
    channels: Vec<ChannelRecord>,
}

/// In-process store. Records live for the lifetime of the value; insertion
/// order is preserved.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every stored alert, oldest first.
    pub fn all_alerts(&self) -> Vec<Alert> {
        self.read().alerts.clone()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>> {
        Ok(self.read().rules.iter().filter(|r| r.enabled).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<AlertRule>> {
        Ok(self.read().rules.clone())
    }

    async fn upsert_by_name(&self, rule: &AlertRule) -> Result<AlertRule> {
        let now = Utc::now();
        let mut inner = self.write();
        let mut incoming = rule.clone();
        incoming.notification_channels.sort_unstable();
        incoming.notification_channels.dedup();

        if let Some(existing) = inner.rules.iter_mut().find(|r| r.name == rule.name) {
            incoming.id = existing.id.clone();
            incoming.created_at = existing.created_at;
            incoming.updated_at = now;
            *existing = incoming.clone();
            return Ok(incoming);
        }

        if incoming.id.is_empty() {
            incoming.id = beacon_common::id::next_id();
        }
        incoming.created_at = now;
        incoming.updated_at = now;
        inner.rules.push(incoming.clone());
        Ok(incoming)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AlertRule>> {
        Ok(self.read().rules.iter().find(|r| r.id == id).cloned())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Option<AlertRule>> {
        let mut inner = self.write();
        Ok(inner.rules.iter_mut().find(|r| r.id == id).map(|r| {
            r.enabled = enabled;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(&self, alert: &Alert) -> Result<()> {
        self.write().alerts.push(alert.clone());
        Ok(())
    }

    async fn latest_alert_for_rule(&self, rule_id: &str) -> Result<Option<Alert>> {
        Ok(self
            .read()
            .alerts
            .iter()
            .filter(|a| a.rule_id == rule_id)
            .max_by_key(|a| a.fired_at)
            .cloned())
    }

    async fn firing_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>> {
        Ok(self
            .read()
            .alerts
            .iter()
            .filter(|a| a.rule_id == rule_id && a.is_firing())
            .cloned()
            .collect())
    }

    async fn resolve_firing_alerts(
        &self,
        rule_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut inner = self.write();
        let mut resolved = Vec::new();
        for alert in inner
            .alerts
            .iter_mut()
            .filter(|a| a.rule_id == rule_id && a.is_firing())
        {
            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(resolved_at);
            resolved.push(alert.id.clone());
        }
        Ok(resolved)
    }

    async fn mark_notification_sent(&self, alert_id: &str) -> Result<bool> {
        let mut inner = self.write();
        match inner.alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.notification_sent = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .read()
            .alerts
            .iter()
            .filter(|a| a.rule_id == rule_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        Ok(alerts)
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn list_enabled_channels(&self, types: &[ChannelType]) -> Result<Vec<ChannelRecord>> {
        Ok(self
            .read()
            .channels
            .iter()
            .filter(|c| c.enabled && types.contains(&c.channel_type))
            .cloned()
            .collect())
    }

    async fn upsert_channel_by_name(&self, channel: &ChannelRecord) -> Result<ChannelRecord> {
        let now = Utc::now();
        let mut inner = self.write();
        let mut incoming = channel.clone();

        if let Some(existing) = inner.channels.iter_mut().find(|c| c.name == channel.name) {
            incoming.id = existing.id.clone();
            incoming.created_at = existing.created_at;
            incoming.updated_at = now;
            *existing = incoming.clone();
            return Ok(incoming);
        }

        if incoming.id.is_empty() {
            incoming.id = beacon_common::id::next_id();
        }
        incoming.created_at = now;
        incoming.updated_at = now;
        inner.channels.push(incoming.clone());
        Ok(incoming)
    }
}
