use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{MetricQueryExecutor, QueryExecutionError, Row};

/// Runs rule queries against a SQLite telemetry database.
///
/// Queries run on the blocking thread pool so a slow aggregate does not stall
/// the async runtime. Dropping the future returned by `run` (for example on a
/// caller's timeout) aborts the statement and releases the connection.
#[derive(Clone)]
pub struct SqliteQueryExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueryExecutor {
    /// Opens the telemetry database read-only, so stored rule queries cannot
    /// modify it.
    pub fn open_read_only(path: &Path) -> Result<Self, QueryExecutionError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::info!(path = %path.display(), "Opened telemetry database");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

/// VM instructions between cancellation checks.
const CANCEL_CHECK_OPS: i32 = 1000;

/// Raises the cancel flag when dropped unless disarmed first.
struct CancelOnDrop {
    cancelled: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancelled.store(true, Ordering::Relaxed);
        }
    }
}

fn run_cancellable(
    conn: &Connection,
    query: &str,
    cancelled: Arc<AtomicBool>,
) -> rusqlite::Result<Vec<Row>> {
    if cancelled.load(Ordering::Relaxed) {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            Some("query cancelled before start".to_string()),
        ));
    }
    conn.progress_handler(
        CANCEL_CHECK_OPS,
        Some(move || cancelled.load(Ordering::Relaxed)),
    );
    let result = run_query(conn, query);
    conn.progress_handler(0, None::<fn() -> bool>);
    result
}

fn run_query(conn: &Connection, query: &str) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(query)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::new();
        for (idx, name) in names.iter().enumerate() {
            map.insert(name.clone(), to_json(row.get_ref(idx)?));
        }
        out.push(map);
    }
    Ok(out)
}

#[async_trait]
impl MetricQueryExecutor for SqliteQueryExecutor {
    async fn run(&self, query: &str) -> Result<Vec<Row>, QueryExecutionError> {
        let conn = Arc::clone(&self.conn);
        let query = query.to_string();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut guard = CancelOnDrop {
            cancelled: Arc::clone(&cancelled),
            armed: true,
        };
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            run_cancellable(&conn, &query, cancelled)
        })
        .await;
        guard.armed = false;
        let rows = result.map_err(|e| QueryExecutionError::Worker(e.to_string()))??;
        Ok(rows)
    }
}
