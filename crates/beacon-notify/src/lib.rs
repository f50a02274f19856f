//! Notification delivery with pluggable channel support.
//!
//! A fired alert is delivered to every enabled channel whose type the rule
//! lists. Each channel type has one [`NotificationChannel`] implementation
//! (webhook, Slack, Discord, email, SMS) created by a matching
//! [`plugin::ChannelPlugin`]. The [`dispatcher::NotificationDispatcher`]
//! delivers to each channel independently so one failure never blocks the
//! others.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod plugin;
pub mod utils;


use async_trait::async_trait;
use beacon_common::types::{Alert, ChannelType};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use dispatcher::{ChannelOutcome, DeliveryStatus, DispatchReport, NotificationDispatcher};
pub use error::{NotifyError, Result};

/// Identifies this system as the sender in outbound payloads.
pub const DEFAULT_SOURCE: &str = "beacon";

/// What a channel delivers: the alert plus send-time context.
///
/// Serializes to the generic webhook body `{alert, timestamp, source}`.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub alert: Alert,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl Notification {
    pub fn new(alert: Alert, timestamp: DateTime<Utc>) -> Self {
        Self {
            alert,
            timestamp,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Title shared by the chat integrations.
    pub fn title(&self) -> String {
        format!("🚨 {}", self.alert.rule_name)
    }
}

/// A delivery channel that sends a notification to an external target.
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// from a stored channel record.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the notification through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    async fn deliver(&self, notification: &Notification) -> Result<()>;

    fn channel_type(&self) -> ChannelType;

    /// Database ID of the channel record this instance was built from.
    fn instance_id(&self) -> &str;
}
