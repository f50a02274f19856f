use async_trait::async_trait;
use beacon_common::types::{AlertRule, Condition};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::alert_rule::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;
use crate::{channels_from_json, channels_to_json, RuleStore};

pub(crate) fn to_rule(m: alert_rule::Model) -> Result<AlertRule> {
    let severity = m.severity.parse().map_err(|e| StorageError::InvalidValue {
        column: "severity",
        message: e,
    })?;
    let notification_channels = channels_from_json(&m.id, &m.notification_channels)?;
    Ok(AlertRule {
        severity,
        notification_channels,
        condition: Condition::parse(&m.condition),
        cooldown_minutes: u32::try_from(m.cooldown_minutes).unwrap_or(0),
        evaluation_window_minutes: u32::try_from(m.evaluation_window_minutes).unwrap_or(0),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
        id: m.id,
        name: m.name,
        description: m.description,
        metric: m.metric,
        threshold: m.threshold,
        enabled: m.enabled,
        query: m.query,
    })
}

#[async_trait]
impl RuleStore for Store {
    async fn list_enabled(&self) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .filter(Column::Enabled.eq(true))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_rule).collect()
    }

    async fn list_all(&self) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_rule).collect()
    }

    async fn upsert_by_name(&self, rule: &AlertRule) -> Result<AlertRule> {
        let now = Utc::now().fixed_offset();
        let channels = channels_to_json(&rule.notification_channels)?;
        let existing = Entity::find()
            .filter(Column::Name.eq(rule.name.as_str()))
            .one(self.db())
            .await?;

        let model = match existing {
            Some(m) => {
                let mut am: alert_rule::ActiveModel = m.into();
                am.description = Set(rule.description.clone());
                am.metric = Set(rule.metric.clone());
                am.condition = Set(rule.condition.to_string());
                am.threshold = Set(rule.threshold);
                am.severity = Set(rule.severity.to_string());
                am.enabled = Set(rule.enabled);
                am.cooldown_minutes = Set(i64::from(rule.cooldown_minutes));
                am.notification_channels = Set(channels);
                am.query = Set(rule.query.clone());
                am.evaluation_window_minutes = Set(i64::from(rule.evaluation_window_minutes));
                am.updated_at = Set(now);
                am.update(self.db()).await?
            }
            None => {
                let id = if rule.id.is_empty() {
                    beacon_common::id::next_id()
                } else {
                    rule.id.clone()
                };
                let am = alert_rule::ActiveModel {
                    id: Set(id),
                    name: Set(rule.name.clone()),
                    description: Set(rule.description.clone()),
                    metric: Set(rule.metric.clone()),
                    condition: Set(rule.condition.to_string()),
                    threshold: Set(rule.threshold),
                    severity: Set(rule.severity.to_string()),
                    enabled: Set(rule.enabled),
                    cooldown_minutes: Set(i64::from(rule.cooldown_minutes)),
                    notification_channels: Set(channels),
                    query: Set(rule.query.clone()),
                    evaluation_window_minutes: Set(i64::from(rule.evaluation_window_minutes)),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(self.db()).await?
            }
        };
        to_rule(model)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AlertRule>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_rule).transpose()
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Option<AlertRule>> {
        let Some(m) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: alert_rule::ActiveModel = m.into();
        am.enabled = Set(enabled);
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        to_rule(updated).map(Some)
    }
}
