use crate::channels::optional_str;
use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::{Notification, NotificationChannel};
use async_trait::async_trait;
use beacon_common::types::ChannelType;
use serde_json::Value;

/// Rendered email, handed to the outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email notifications. No SMTP transport is wired in; messages are
/// rendered and written to the log as the outbound queue.
pub struct EmailChannel {
    instance_id: String,
    address: String,
}

impl EmailChannel {
    pub fn new(instance_id: &str, address: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            address: address.to_string(),
        }
    }
}

pub fn build_message(notification: &Notification, to: &str) -> EmailMessage {
    let alert = &notification.alert;
    let subject = format!(
        "[{}] [{}] {}",
        notification.source,
        alert.severity.to_string().to_uppercase(),
        alert.rule_name
    );
    let body = format!(
        "{message}\n\nSeverity: {severity}\nCurrent value: {value}\nThreshold: {threshold}\nFired at: {fired}\n",
        message = alert.message,
        severity = alert.severity,
        value = alert.current_value,
        threshold = alert.threshold,
        fired = alert.fired_at.to_rfc3339(),
    );
    EmailMessage {
        to: to.to_string(),
        subject,
        body,
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification, &self.address);
        tracing::info!(
            channel_id = %self.instance_id,
            to = %message.to,
            subject = %message.subject,
            alert_id = %notification.alert.id,
            "Email notification queued"
        );
        Ok(())
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

// Plugin

fn address(config: &Value) -> Result<String> {
    let address = optional_str(config, "address")
        .ok_or_else(|| NotifyError::InvalidConfig("missing 'address'".to_string()))?;
    if !address.contains('@') {
        return Err(NotifyError::InvalidConfig(format!(
            "invalid email address '{address}'"
        )));
    }
    Ok(address)
}

pub struct EmailPlugin;

impl ChannelPlugin for EmailPlugin {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        address(config).map(|_| ())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        config: &Value,
    ) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(EmailChannel::new(instance_id, &address(config)?)))
    }
}
