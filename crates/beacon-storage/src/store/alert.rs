use async_trait::async_trait;
use beacon_common::types::{Alert, AlertStatus};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::alert::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;
use crate::AlertStore;

fn to_alert(m: alert::Model) -> Result<Alert> {
    let severity = m.severity.parse().map_err(|e| StorageError::InvalidValue {
        column: "severity",
        message: e,
    })?;
    let status = m.status.parse().map_err(|e| StorageError::InvalidValue {
        column: "status",
        message: e,
    })?;
    let metadata = serde_json::from_str(&m.metadata)?;
    Ok(Alert {
        severity,
        status,
        metadata,
        fired_at: m.fired_at.with_timezone(&Utc),
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        id: m.id,
        rule_id: m.rule_id,
        rule_name: m.rule_name,
        message: m.message,
        current_value: m.current_value,
        threshold: m.threshold,
        notification_sent: m.notification_sent,
    })
}

#[async_trait]
impl AlertStore for Store {
    async fn insert_alert(&self, a: &Alert) -> Result<()> {
        let am = alert::ActiveModel {
            id: Set(a.id.clone()),
            rule_id: Set(a.rule_id.clone()),
            rule_name: Set(a.rule_name.clone()),
            severity: Set(a.severity.to_string()),
            message: Set(a.message.clone()),
            current_value: Set(a.current_value),
            threshold: Set(a.threshold),
            status: Set(a.status.to_string()),
            fired_at: Set(a.fired_at.fixed_offset()),
            resolved_at: Set(a.resolved_at.map(|t| t.fixed_offset())),
            notification_sent: Set(a.notification_sent),
            metadata: Set(serde_json::to_string(&a.metadata)?),
        };
        am.insert(self.db()).await?;
        Ok(())
    }

    async fn latest_alert_for_rule(&self, rule_id: &str) -> Result<Option<Alert>> {
        let model = Entity::find()
            .filter(Column::RuleId.eq(rule_id))
            .order_by(Column::FiredAt, Order::Desc)
            .one(self.db())
            .await?;
        model.map(to_alert).transpose()
    }

    async fn firing_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>> {
        let rows = Entity::find()
            .filter(Column::RuleId.eq(rule_id))
            .filter(Column::Status.eq(AlertStatus::Firing.to_string()))
            .order_by(Column::FiredAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_alert).collect()
    }

    async fn resolve_firing_alerts(
        &self,
        rule_id: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let firing = Entity::find()
            .filter(Column::RuleId.eq(rule_id))
            .filter(Column::Status.eq(AlertStatus::Firing.to_string()))
            .all(self.db())
            .await?;

        let mut resolved = Vec::with_capacity(firing.len());
        for m in firing {
            let id = m.id.clone();
            let mut am: alert::ActiveModel = m.into();
            am.status = Set(AlertStatus::Resolved.to_string());
            am.resolved_at = Set(Some(resolved_at.fixed_offset()));
            am.update(self.db()).await?;
            resolved.push(id);
        }
        Ok(resolved)
    }

    async fn mark_notification_sent(&self, alert_id: &str) -> Result<bool> {
        let Some(m) = Entity::find_by_id(alert_id).one(self.db()).await? else {
            return Ok(false);
        };
        let mut am: alert::ActiveModel = m.into();
        am.notification_sent = Set(true);
        am.update(self.db()).await?;
        Ok(true)
    }

    async fn list_alerts_for_rule(&self, rule_id: &str) -> Result<Vec<Alert>> {
        let rows = Entity::find()
            .filter(Column::RuleId.eq(rule_id))
            .order_by(Column::FiredAt, Order::Desc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_alert).collect()
    }
}
