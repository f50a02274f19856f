//! Metric query execution against the telemetry store.

pub mod http;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub use http::HttpQueryExecutor;
pub use sqlite::SqliteQueryExecutor;

/// One result row: field name to value.
pub type Row = serde_json::Map<String, Value>;

/// A telemetry store call failed. The rule is skipped for the tick.
#[derive(Debug, thiserror::Error)]
pub enum QueryExecutionError {
    #[error("Query: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Query: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Query: telemetry endpoint returned status={status}, body={body}")]
    Api { status: u16, body: String },

    #[error("Query: unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("Query: timed out after {0:?}")]
    Timeout(Duration),

    #[error("Query: worker task failed: {0}")]
    Worker(String),
}

/// Runs an opaque query string and returns the rows it produced.
#[async_trait]
pub trait MetricQueryExecutor: Send + Sync {
    async fn run(&self, query: &str) -> Result<Vec<Row>, QueryExecutionError>;
}

/// Extracts `metric` from the first row.
///
/// Returns `None` ("no signal") for an empty result, a missing field, a
/// null, or anything that is not a number or a numeric string.
///
/// # Examples
///
/// ```
/// use beacon_storage::telemetry::{metric_value, Row};
///
/// let mut row = Row::new();
/// row.insert("error_rate".into(), serde_json::json!(0.12));
/// assert_eq!(metric_value(&[row.clone()], "error_rate"), Some(0.12));
/// assert_eq!(metric_value(&[row], "latency"), None);
/// assert_eq!(metric_value(&[], "error_rate"), None);
/// ```
pub fn metric_value(rows: &[Row], metric: &str) -> Option<f64> {
    match rows.first()?.get(metric)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
