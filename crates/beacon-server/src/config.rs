use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub id: IdConfig,
    /// Channels upserted by name at startup.
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Overrides `data_dir` when set, e.g. `sqlite:///var/lib/beacon/beacon.db?mode=rwc`.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            url: None,
        }
    }
}

/// Snowflake ID generator identity. Instances sharing a database need
/// distinct pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_id_part")]
    pub machine_id: i32,
    #[serde(default = "default_id_part")]
    pub node_id: i32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            machine_id: default_id_part(),
            node_id: default_id_part(),
        }
    }
}

impl IdConfig {
    pub const MAX_PART: i32 = 31;

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [("machine_id", self.machine_id), ("node_id", self.node_id)] {
            if !(0..=Self::MAX_PART).contains(&value) {
                anyhow::bail!("id.{field} must be between 0 and {}, got {value}", Self::MAX_PART);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryBackend {
    Sqlite,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_backend")]
    pub backend: TelemetryBackend,
    /// SQLite telemetry database, opened read-only.
    #[serde(default = "default_telemetry_path")]
    pub path: String,
    /// Query endpoint for the `http` backend.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            backend: default_telemetry_backend(),
            path: default_telemetry_path(),
            url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_seed_default_rules")]
    pub seed_default_rules: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            seed_default_rules: default_seed_default_rules(),
        }
    }
}

impl EvaluationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }
}

// ---- Seed file types (used by `init-channels` CLI subcommand) ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsSeedFile {
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedChannel {
    pub name: String,
    pub channel_type: String,
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

// ---- Rules seed file types (used by `init-rules` CLI subcommand) ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSeedFile {
    #[serde(default)]
    pub rules: Vec<SeedAlertRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAlertRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric: String,
    pub condition: String,
    pub threshold: f64,
    #[serde(default = "default_seed_severity")]
    pub severity: String,
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u32,
    #[serde(default)]
    pub notification_channels: Vec<String>,
    pub query: String,
    #[serde(default = "default_evaluation_window_minutes")]
    pub evaluation_window_minutes: u32,
}

fn default_id_part() -> i32 {
    1
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_telemetry_backend() -> TelemetryBackend {
    TelemetryBackend::Sqlite
}

fn default_telemetry_path() -> String {
    "data/telemetry.db".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_delivery_timeout_secs() -> u64 {
    10
}

fn default_seed_default_rules() -> bool {
    true
}

fn default_seed_enabled() -> bool {
    true
}

fn default_seed_severity() -> String {
    "warning".to_string()
}

fn default_cooldown_minutes() -> u32 {
    5
}

fn default_evaluation_window_minutes() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => {
                let path = PathBuf::from(&self.data_dir).join(beacon_storage::store::DEFAULT_DB_FILE);
                format!("sqlite://{}?mode=rwc", path.display())
            }
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{path}': {e}"))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{path}': {e}"))?;
        config
            .id
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config '{path}': {e}"))?;
        Ok(config)
    }
}
