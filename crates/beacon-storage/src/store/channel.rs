use async_trait::async_trait;
use beacon_common::types::{ChannelRecord, ChannelType};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::notification_channel::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;
use crate::ChannelStore;

fn to_channel(m: notification_channel::Model) -> Result<ChannelRecord> {
    let channel_type = m
        .channel_type
        .parse()
        .map_err(|e| StorageError::InvalidValue {
            column: "channel_type",
            message: e,
        })?;
    Ok(ChannelRecord {
        channel_type,
        config: serde_json::from_str(&m.config_json)?,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
        id: m.id,
        name: m.name,
        enabled: m.enabled,
    })
}

#[async_trait]
impl ChannelStore for Store {
    async fn list_enabled_channels(&self, types: &[ChannelType]) -> Result<Vec<ChannelRecord>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Entity::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::ChannelType.is_in(types.iter().map(|t| t.as_str())))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;

        let mut channels = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match to_channel(row) {
                Ok(ch) => channels.push(ch),
                Err(e) => {
                    tracing::warn!(channel_id = %id, error = %e, "Skipping unreadable notification channel");
                }
            }
        }
        Ok(channels)
    }

    async fn upsert_channel_by_name(&self, ch: &ChannelRecord) -> Result<ChannelRecord> {
        let now = Utc::now().fixed_offset();
        let config_json = serde_json::to_string(&ch.config)?;
        let existing = Entity::find()
            .filter(Column::Name.eq(ch.name.as_str()))
            .one(self.db())
            .await?;

        let model = match existing {
            Some(m) => {
                let mut am: notification_channel::ActiveModel = m.into();
                am.channel_type = Set(ch.channel_type.to_string());
                am.config_json = Set(config_json);
                am.enabled = Set(ch.enabled);
                am.updated_at = Set(now);
                am.update(self.db()).await?
            }
            None => {
                let id = if ch.id.is_empty() {
                    beacon_common::id::next_id()
                } else {
                    ch.id.clone()
                };
                let am = notification_channel::ActiveModel {
                    id: Set(id),
                    name: Set(ch.name.clone()),
                    channel_type: Set(ch.channel_type.to_string()),
                    config_json: Set(config_json),
                    enabled: Set(ch.enabled),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(self.db()).await?
            }
        };
        to_channel(model)
    }
}
