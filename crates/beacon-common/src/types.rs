use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use beacon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Comparison applied between a sampled metric value and a rule threshold.
///
/// Rules are loaded from storage where the condition is a free-form string,
/// so an unrecognised operator is kept as [`Condition::Unknown`] instead of
/// failing the load. Unknown conditions never match.
///
/// # Examples
///
/// ```
/// use beacon_common::types::Condition;
///
/// assert!(Condition::GreaterThan.evaluate(0.15, 0.1));
/// assert!(!Condition::parse("between").evaluate(0.15, 0.1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    GreaterThan,
    LessThan,
    Equals,
    NotEquals,
    Unknown(String),
}

impl Condition {
    pub fn parse(s: &str) -> Self {
        match s {
            "greater_than" | "gt" => Self::GreaterThan,
            "less_than" | "lt" => Self::LessThan,
            "equals" | "eq" => Self::Equals,
            "not_equals" | "ne" => Self::NotEquals,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Unknown(raw) => raw,
        }
    }

    /// Compares `value` against `threshold`. Pure and total.
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::Equals => value == threshold,
            Self::NotEquals => value != threshold,
            Self::Unknown(_) => false,
        }
    }

    /// Short phrase used in alert messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::GreaterThan => "above",
            Self::LessThan => "below",
            Self::Equals => "equal to",
            Self::NotEquals => "not equal to",
            Self::Unknown(_) => "compared with",
        }
    }
}

impl From<String> for Condition {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-function form of [`Condition::evaluate`].
pub fn evaluate(value: f64, condition: &Condition, threshold: f64) -> bool {
    condition.evaluate(value, threshold)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Firing => write!(f, "firing"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firing" => Ok(AlertStatus::Firing),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// Delivery target kind. One notification channel implementation exists per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Webhook,
    Slack,
    Discord,
    Sms,
}

impl ChannelType {
    pub const ALL: [ChannelType; 5] = [
        ChannelType::Email,
        ChannelType::Webhook,
        ChannelType::Slack,
        ChannelType::Discord,
        ChannelType::Sms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Webhook => "webhook",
            ChannelType::Slack => "slack",
            ChannelType::Discord => "discord",
            ChannelType::Sms => "sms",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(ChannelType::Email),
            "webhook" => Ok(ChannelType::Webhook),
            "slack" => Ok(ChannelType::Slack),
            "discord" => Ok(ChannelType::Discord),
            "sms" => Ok(ChannelType::Sms),
            _ => Err(format!("unknown channel type: {s}")),
        }
    }
}

/// A declarative threshold policy against one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    /// Unique; the key for idempotent upserts.
    pub name: String,
    pub description: String,
    /// Field the rule's query must yield.
    pub metric: String,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    pub enabled: bool,
    pub cooldown_minutes: u32,
    pub notification_channels: Vec<ChannelType>,
    /// Opaque, store-specific query producing one row containing `metric`.
    pub query: String,
    /// Time range the query covers. Informational only.
    pub evaluation_window_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One firing/resolved instance of a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub current_value: f64,
    pub threshold: f64,
    pub status: AlertStatus,
    pub fired_at: DateTime<Utc>,
    /// Set iff `status == Resolved`.
    pub resolved_at: Option<DateTime<Utc>>,
    pub notification_sent: bool,
    pub metadata: serde_json::Value,
}

impl Alert {
    pub fn is_firing(&self) -> bool {
        self.status == AlertStatus::Firing
    }
}

/// A configured delivery target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub channel_type: ChannelType,
    /// Type-specific settings, e.g. `{"url": "..."}` or `{"address": "..."}`.
    pub config: serde_json::Value,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
