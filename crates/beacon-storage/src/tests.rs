use crate::telemetry::http::parse_rows;
use crate::telemetry::{metric_value, HttpQueryExecutor, MetricQueryExecutor, SqliteQueryExecutor};
use crate::{AlertStore, ChannelStore, MemoryStore, RuleStore, Store};
use beacon_common::types::{
    Alert, AlertRule, AlertStatus, ChannelRecord, ChannelType, Condition, Severity,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;

async fn setup() -> (TempDir, Store) {
    beacon_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path()).await.unwrap();
    (dir, store)
}

fn make_rule(name: &str, threshold: f64, enabled: bool) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: String::new(),
        name: name.to_string(),
        description: format!("{name} description"),
        metric: "error_rate".to_string(),
        condition: Condition::GreaterThan,
        threshold,
        severity: Severity::Critical,
        enabled,
        cooldown_minutes: 5,
        notification_channels: vec![ChannelType::Webhook, ChannelType::Slack],
        query: "SELECT 0.12 AS error_rate".to_string(),
        evaluation_window_minutes: 5,
        created_at: now,
        updated_at: now,
    }
}

fn make_alert(rule_id: &str, minutes_ago: i64, status: AlertStatus) -> Alert {
    let fired_at = Utc::now() - Duration::minutes(minutes_ago);
    Alert {
        id: beacon_common::id::next_id(),
        rule_id: rule_id.to_string(),
        rule_name: "High Error Rate".to_string(),
        severity: Severity::Critical,
        message: "error_rate is 0.1200, above threshold 0.1000".to_string(),
        current_value: 0.12,
        threshold: 0.1,
        status,
        fired_at,
        resolved_at: (status == AlertStatus::Resolved).then_some(fired_at),
        notification_sent: false,
        metadata: json!({"evaluation_window_minutes": 5}),
    }
}

fn make_channel(name: &str, channel_type: ChannelType, enabled: bool) -> ChannelRecord {
    let now = Utc::now();
    ChannelRecord {
        id: String::new(),
        name: name.to_string(),
        channel_type,
        config: json!({"url": "https://hooks.example.com/alerts"}),
        enabled,
        created_at: now,
        updated_at: now,
    }
}

// ── Rule store ──

#[tokio::test]
async fn upsert_by_name_is_idempotent() {
    let (_dir, store) = setup().await;

    let first = store
        .upsert_by_name(&make_rule("High Error Rate", 0.1, true))
        .await
        .unwrap();
    let second = store
        .upsert_by_name(&make_rule("High Error Rate", 0.2, true))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.threshold, 0.2);

    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].threshold, 0.2);
    assert_eq!(
        all[0].notification_channels,
        vec![ChannelType::Slack, ChannelType::Webhook]
    );
}

#[tokio::test]
async fn list_enabled_skips_disabled_rules() {
    let (_dir, store) = setup().await;
    store
        .upsert_by_name(&make_rule("enabled", 0.1, true))
        .await
        .unwrap();
    let disabled = store
        .upsert_by_name(&make_rule("disabled", 0.1, false))
        .await
        .unwrap();

    let enabled = store.list_enabled().await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].name, "enabled");

    let updated = store.set_enabled(&disabled.id, true).await.unwrap().unwrap();
    assert!(updated.enabled);
    assert_eq!(store.list_enabled().await.unwrap().len(), 2);
    assert!(store.set_enabled("missing", true).await.unwrap().is_none());
}

#[tokio::test]
async fn get_by_id_round_trips_condition_and_channels() {
    let (_dir, store) = setup().await;
    let mut rule = make_rule("Odd Condition", 1.0, true);
    rule.condition = Condition::parse("between");
    rule.notification_channels = vec![ChannelType::Discord, ChannelType::Discord];
    let saved = store.upsert_by_name(&rule).await.unwrap();

    let loaded = store.get_by_id(&saved.id).await.unwrap().unwrap();
    assert_eq!(loaded.condition, Condition::Unknown("between".into()));
    assert_eq!(loaded.notification_channels, vec![ChannelType::Discord]);
    assert!(store.get_by_id("nope").await.unwrap().is_none());
}

// ── Alert store ──

#[tokio::test]
async fn latest_alert_is_newest_by_fired_at() {
    let (_dir, store) = setup().await;
    let old = make_alert("rule-1", 30, AlertStatus::Resolved);
    let recent = make_alert("rule-1", 2, AlertStatus::Firing);
    store.insert_alert(&recent).await.unwrap();
    store.insert_alert(&old).await.unwrap();
    store
        .insert_alert(&make_alert("rule-2", 0, AlertStatus::Firing))
        .await
        .unwrap();

    let latest = store.latest_alert_for_rule("rule-1").await.unwrap().unwrap();
    assert_eq!(latest.id, recent.id);
    assert!(store.latest_alert_for_rule("rule-3").await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_handles_multiple_firing_alerts() {
    let (_dir, store) = setup().await;
    store
        .insert_alert(&make_alert("rule-1", 20, AlertStatus::Firing))
        .await
        .unwrap();
    store
        .insert_alert(&make_alert("rule-1", 10, AlertStatus::Firing))
        .await
        .unwrap();
    store
        .insert_alert(&make_alert("rule-1", 40, AlertStatus::Resolved))
        .await
        .unwrap();

    let now = Utc::now();
    let resolved = store.resolve_firing_alerts("rule-1", now).await.unwrap();
    assert_eq!(resolved.len(), 2);
    assert!(store.firing_alerts_for_rule("rule-1").await.unwrap().is_empty());

    for alert in store.list_alerts_for_rule("rule-1").await.unwrap() {
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert!(alert.resolved_at.is_some());
    }

    // Nothing left to resolve
    assert!(store
        .resolve_firing_alerts("rule-1", now)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn mark_notification_sent_updates_flag() {
    let (_dir, store) = setup().await;
    let alert = make_alert("rule-1", 0, AlertStatus::Firing);
    store.insert_alert(&alert).await.unwrap();

    assert!(store.mark_notification_sent(&alert.id).await.unwrap());
    assert!(!store.mark_notification_sent("missing").await.unwrap());

    let stored = store.latest_alert_for_rule("rule-1").await.unwrap().unwrap();
    assert!(stored.notification_sent);
    assert_eq!(stored.metadata["evaluation_window_minutes"], 5);
}

// ── Channel store ──

#[tokio::test]
async fn list_enabled_channels_filters_by_type_and_enabled() {
    let (_dir, store) = setup().await;
    store
        .upsert_channel_by_name(&make_channel("ops-webhook", ChannelType::Webhook, true))
        .await
        .unwrap();
    store
        .upsert_channel_by_name(&make_channel("ops-slack", ChannelType::Slack, true))
        .await
        .unwrap();
    store
        .upsert_channel_by_name(&make_channel("old-slack", ChannelType::Slack, false))
        .await
        .unwrap();
    store
        .upsert_channel_by_name(&make_channel("pager", ChannelType::Sms, true))
        .await
        .unwrap();

    let found = store
        .list_enabled_channels(&[ChannelType::Webhook, ChannelType::Slack])
        .await
        .unwrap();
    let mut names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["ops-slack", "ops-webhook"]);

    assert!(store.list_enabled_channels(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn upsert_channel_by_name_updates_config() {
    let (_dir, store) = setup().await;
    let first = store
        .upsert_channel_by_name(&make_channel("ops", ChannelType::Webhook, true))
        .await
        .unwrap();
    let mut changed = make_channel("ops", ChannelType::Webhook, true);
    changed.config = json!({"url": "https://hooks.example.com/v2"});
    let second = store.upsert_channel_by_name(&changed).await.unwrap();

    assert_eq!(first.id, second.id);
    let found = store
        .list_enabled_channels(&[ChannelType::Webhook])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].config["url"], "https://hooks.example.com/v2");
}

// ── Memory store parity ──

#[tokio::test]
async fn memory_store_upsert_and_resolve() {
    let store = MemoryStore::new();
    let first = store
        .upsert_by_name(&make_rule("High Error Rate", 0.1, true))
        .await
        .unwrap();
    let second = store
        .upsert_by_name(&make_rule("High Error Rate", 0.3, true))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(store.list_all().await.unwrap().len(), 1);

    store
        .insert_alert(&make_alert(&first.id, 3, AlertStatus::Firing))
        .await
        .unwrap();
    let resolved = store
        .resolve_firing_alerts(&first.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(store.all_alerts()[0].resolved_at.is_some());
}

// ── Telemetry ──

#[test]
fn metric_value_treats_missing_and_null_as_no_signal() {
    let rows = parse_rows(json!([{"error_rate": null, "count": "17", "label": "x"}])).unwrap();
    assert_eq!(metric_value(&rows, "error_rate"), None);
    assert_eq!(metric_value(&rows, "count"), Some(17.0));
    assert_eq!(metric_value(&rows, "label"), None);
    assert_eq!(metric_value(&rows, "absent"), None);
}

#[test]
fn parse_rows_accepts_array_or_rows_object() {
    assert_eq!(parse_rows(json!([{"a": 1}, {"a": 2}])).unwrap().len(), 2);
    assert_eq!(parse_rows(json!({"rows": [{"a": 1}]})).unwrap().len(), 1);
    assert!(parse_rows(json!({"data": []})).is_err());
    assert!(parse_rows(json!([1, 2])).is_err());
    assert!(parse_rows(json!("nope")).is_err());
}

#[tokio::test]
async fn sqlite_executor_runs_stored_query() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("telemetry.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE requests (ts INTEGER NOT NULL, failed INTEGER NOT NULL);
             INSERT INTO requests VALUES (1, 1), (2, 0), (3, 0), (4, 0);",
        )
        .unwrap();
    }

    let executor = SqliteQueryExecutor::open_read_only(&path).unwrap();
    let rows = executor
        .run("SELECT AVG(failed) AS error_rate, COUNT(*) AS total, NULL AS missing FROM requests")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(metric_value(&rows, "error_rate"), Some(0.25));
    assert_eq!(metric_value(&rows, "total"), Some(4.0));
    assert_eq!(metric_value(&rows, "missing"), None);

    // Read-only: writes from a rule query are rejected
    assert!(executor.run("DELETE FROM requests").await.is_err());
    assert!(executor.run("SELECT * FROM nope").await.is_err());
}

#[tokio::test]
async fn sqlite_executor_timed_out_query_does_not_block_next_query() {
    let executor = SqliteQueryExecutor::from_connection(rusqlite::Connection::open_in_memory().unwrap());
    let slow = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 300000000) \
                SELECT COUNT(*) AS v FROM c";

    let timed_out =
        tokio::time::timeout(std::time::Duration::from_millis(200), executor.run(slow)).await;
    assert!(timed_out.is_err());

    let started = std::time::Instant::now();
    let rows = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        executor.run("SELECT 1 AS v"),
    )
    .await
    .expect("fast query should not wait for the abandoned one")
    .unwrap();
    assert_eq!(metric_value(&rows, "v"), Some(1.0));
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[tokio::test]
async fn http_executor_posts_query_and_parses_rows() {
    use axum::{routing::post, Json, Router};

    let app = Router::new().route(
        "/query",
        post(|Json(body): Json<serde_json::Value>| async move {
            Json(json!({"rows": [{"error_rate": 0.12, "echo": body["query"]}]}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let executor = HttpQueryExecutor::new(&format!("http://{addr}/query"), None);
    let rows = executor.run("select error_rate").await.unwrap();
    assert_eq!(metric_value(&rows, "error_rate"), Some(0.12));
    assert_eq!(rows[0]["echo"], "select error_rate");

    let missing = HttpQueryExecutor::new(&format!("http://{addr}/other"), None);
    let err = missing.run("select 1").await.unwrap_err();
    assert!(err.to_string().contains("status=404"), "{err}");
}

#[tokio::test]
async fn http_executor_truncates_error_body() {
    use axum::{http::StatusCode, routing::post, Router};

    let app = Router::new().route(
        "/query",
        post(|| async { (StatusCode::BAD_GATEWAY, "é".repeat(600)) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let executor = HttpQueryExecutor::new(&format!("http://{addr}/query"), None);
    match executor.run("select 1").await {
        Err(crate::telemetry::QueryExecutionError::Api { status, body }) => {
            assert_eq!(status, 502);
            assert!(body.ends_with("... [truncated]"), "{body}");
            assert_eq!(body.trim_end_matches("... [truncated]"), "é".repeat(256));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}
