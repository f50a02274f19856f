use crate::defaults::{default_rules, seed_default_rules};
use crate::engine::{AlertEngine, EngineConfig, RuleOutcome};
use crate::error::EngineError;
use crate::lifecycle::AlertLifecycleManager;
use crate::scheduler::{Scheduler, SchedulerConfig};
use async_trait::async_trait;
use beacon_common::clock::{Clock, ManualClock};
use beacon_common::types::{
    Alert, AlertRule, AlertStatus, ChannelRecord, ChannelType, Condition, Severity,
};
use beacon_notify::plugin::{ChannelPlugin, ChannelRegistry};
use beacon_notify::{Notification, NotificationChannel, NotificationDispatcher, NotifyError};
use beacon_storage::telemetry::{MetricQueryExecutor, QueryExecutionError, Row};
use beacon_storage::{AlertStore, ChannelStore, MemoryStore, RuleStore, StorageError};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ──

/// Answers queries from a table; unknown queries return no rows.
#[derive(Default)]
struct FakeExecutor {
    responses: Mutex<HashMap<String, Result<Vec<Value>, String>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeExecutor {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn set(&self, query: &str, rows: Vec<Value>) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Ok(rows));
    }

    fn set_value(&self, query: &str, metric: &str, value: Value) {
        self.set(query, vec![json!({ metric: value })]);
    }

    fn fail(&self, query: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), Err("telemetry offline".to_string()));
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricQueryExecutor for FakeExecutor {
    async fn run(&self, query: &str) -> Result<Vec<Row>, QueryExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.responses.lock().unwrap().get(query).cloned();
        match response {
            None => Ok(Vec::new()),
            Some(Err(e)) => Err(QueryExecutionError::InvalidResponse(e)),
            Some(Ok(rows)) => Ok(rows
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => Row::new(),
                })
                .collect()),
        }
    }
}

type Deliveries = Arc<Mutex<Vec<(ChannelType, String)>>>;

/// Records deliveries, or fails every delivery when `fail` is set.
struct RecordingPlugin {
    channel_type: ChannelType,
    fail: bool,
    deliveries: Deliveries,
}

struct RecordingChannel {
    id: String,
    channel_type: ChannelType,
    fail: bool,
    deliveries: Deliveries,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn deliver(&self, notification: &Notification) -> beacon_notify::Result<()> {
        if self.fail {
            return Err(NotifyError::ApiError {
                service: self.channel_type.to_string(),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        self.deliveries
            .lock()
            .unwrap()
            .push((self.channel_type, notification.alert.id.clone()));
        Ok(())
    }

    fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    fn instance_id(&self) -> &str {
        &self.id
    }
}

impl ChannelPlugin for RecordingPlugin {
    fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    fn validate_config(&self, _config: &Value) -> beacon_notify::Result<()> {
        Ok(())
    }

    fn create_channel(
        &self,
        instance_id: &str,
        _config: &Value,
    ) -> beacon_notify::Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(RecordingChannel {
            id: instance_id.to_string(),
            channel_type: self.channel_type,
            fail: self.fail,
            deliveries: self.deliveries.clone(),
        }))
    }
}

/// Rule store whose listing always fails.
#[derive(Default)]
struct BrokenRuleStore {
    list_calls: AtomicUsize,
}

#[async_trait]
impl RuleStore for BrokenRuleStore {
    async fn list_enabled(&self) -> beacon_storage::Result<Vec<AlertRule>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::InvalidValue {
            column: "enabled",
            message: "database is locked".to_string(),
        })
    }

    async fn list_all(&self) -> beacon_storage::Result<Vec<AlertRule>> {
        Ok(Vec::new())
    }

    async fn upsert_by_name(&self, rule: &AlertRule) -> beacon_storage::Result<AlertRule> {
        Ok(rule.clone())
    }

    async fn get_by_id(&self, _id: &str) -> beacon_storage::Result<Option<AlertRule>> {
        Ok(None)
    }

    async fn set_enabled(
        &self,
        _id: &str,
        _enabled: bool,
    ) -> beacon_storage::Result<Option<AlertRule>> {
        Ok(None)
    }
}

// ── Harness ──

struct Harness {
    store: Arc<MemoryStore>,
    executor: Arc<FakeExecutor>,
    clock: Arc<ManualClock>,
    deliveries: Deliveries,
    engine: Arc<AlertEngine>,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn rule(name: &str, query: &str) -> AlertRule {
    AlertRule {
        id: String::new(),
        name: name.to_string(),
        description: format!("{name} description"),
        metric: "error_rate".to_string(),
        condition: Condition::GreaterThan,
        threshold: 0.1,
        severity: Severity::Critical,
        enabled: true,
        cooldown_minutes: 5,
        notification_channels: vec![ChannelType::Webhook, ChannelType::Slack],
        query: query.to_string(),
        evaluation_window_minutes: 5,
        created_at: t0(),
        updated_at: t0(),
    }
}

fn channel(name: &str, channel_type: ChannelType) -> ChannelRecord {
    ChannelRecord {
        id: String::new(),
        name: name.to_string(),
        channel_type,
        config: json!({"url": "http://127.0.0.1:9/unused"}),
        enabled: true,
        created_at: t0(),
        updated_at: t0(),
    }
}

async fn harness_with(executor: FakeExecutor, failing_webhook: bool, config: EngineConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_channel_by_name(&channel("ops-webhook", ChannelType::Webhook))
        .await
        .unwrap();
    store
        .upsert_channel_by_name(&channel("ops-slack", ChannelType::Slack))
        .await
        .unwrap();

    let deliveries: Deliveries = Arc::default();
    let mut registry = ChannelRegistry::new();
    registry.register(Box::new(RecordingPlugin {
        channel_type: ChannelType::Webhook,
        fail: failing_webhook,
        deliveries: deliveries.clone(),
    }));
    registry.register(Box::new(RecordingPlugin {
        channel_type: ChannelType::Slack,
        fail: false,
        deliveries: deliveries.clone(),
    }));

    let clock = Arc::new(ManualClock::new(t0()));
    let executor = Arc::new(executor);
    let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), registry));
    let lifecycle = AlertLifecycleManager::new(store.clone(), dispatcher, clock.clone());
    let engine = Arc::new(AlertEngine::new(
        store.clone(),
        executor.clone(),
        lifecycle,
        config,
    ));
    Harness {
        store,
        executor,
        clock,
        deliveries,
        engine,
    }
}

async fn harness() -> Harness {
    harness_with(FakeExecutor::default(), false, EngineConfig::default()).await
}

impl Harness {
    async fn add_rule(&self, rule: AlertRule) -> AlertRule {
        self.store.upsert_by_name(&rule).await.unwrap()
    }

    async fn alerts(&self, rule_id: &str) -> Vec<Alert> {
        self.store.list_alerts_for_rule(rule_id).await.unwrap()
    }

    fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(ChronoDuration::minutes(minutes));
    }
}

// ── Engine and lifecycle ──

#[tokio::test]
async fn disabled_rules_are_never_evaluated() {
    let h = harness().await;
    let mut disabled = rule("Disabled", "q-disabled");
    disabled.enabled = false;
    let disabled = h.add_rule(disabled).await;
    h.executor.set_value("q-disabled", "error_rate", json!(0.5));

    let summary = h.engine.evaluate_all().await.unwrap();
    assert_eq!(summary.evaluated, 0);
    assert_eq!(h.executor.calls(), 0);
    assert!(h.alerts(&disabled.id).await.is_empty());

    // Calling evaluate_rule directly is also a no-op.
    assert!(matches!(
        h.engine.evaluate_rule(&disabled).await.unwrap(),
        RuleOutcome::Normal
    ));
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test]
async fn fires_once_and_does_not_duplicate_within_cooldown() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;

    h.executor.set_value("q", "error_rate", json!(0.15));
    let outcome = h.engine.evaluate_rule(&r).await.unwrap();
    let RuleOutcome::Fired(alert) = outcome else {
        panic!("expected fire, got {outcome:?}");
    };
    assert_eq!(alert.status, AlertStatus::Firing);
    assert_eq!(alert.fired_at, t0());
    assert_eq!(alert.current_value, 0.15);
    assert_eq!(alert.message, "error_rate is 0.1500, above threshold 0.1000");
    assert_eq!(alert.metadata["metric"], "error_rate");
    assert_eq!(alert.metadata["condition"], "greater_than");
    assert_eq!(alert.metadata["evaluation_window_minutes"], 5);
    assert!(alert.notification_sent);

    h.advance_minutes(1);
    h.executor.set_value("q", "error_rate", json!(0.2));
    assert!(h.engine.lifecycle().is_in_cooldown(&r).await.unwrap());
    h.engine.evaluate_rule(&r).await.unwrap();

    let alerts = h.alerts(&r.id).await;
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].notification_sent);
    assert_eq!(h.deliveries.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn resolves_after_cooldown_without_new_alert() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;

    h.executor.set_value("q", "error_rate", json!(0.15));
    h.engine.evaluate_rule(&r).await.unwrap();

    h.advance_minutes(6);
    h.executor.set_value("q", "error_rate", json!(0.05));
    let outcome = h.engine.evaluate_rule(&r).await.unwrap();
    assert!(matches!(outcome, RuleOutcome::Resolved(1)), "{outcome:?}");

    let alerts = h.alerts(&r.id).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, AlertStatus::Resolved);
    assert_eq!(alerts[0].resolved_at, Some(t0() + ChronoDuration::minutes(6)));
}

#[tokio::test]
async fn resolution_is_not_gated_by_cooldown_but_refire_is() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;

    h.executor.set_value("q", "error_rate", json!(0.15));
    h.engine.evaluate_rule(&r).await.unwrap();

    h.advance_minutes(1);
    h.executor.set_value("q", "error_rate", json!(0.05));
    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::Resolved(1)
    ));

    // Cooldown counts from the last fired_at, resolved or not.
    h.advance_minutes(1);
    h.executor.set_value("q", "error_rate", json!(0.3));
    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::Suppressed
    ));
    assert_eq!(h.alerts(&r.id).await.len(), 1);

    h.advance_minutes(4);
    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::Fired(_)
    ));
    let alerts = h.alerts(&r.id).await;
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].fired_at, t0() + ChronoDuration::minutes(6));
    assert!(alerts[0].is_firing());
    assert!(!alerts[1].is_firing());
}

#[tokio::test]
async fn condition_still_true_after_cooldown_keeps_single_firing_alert() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;

    h.executor.set_value("q", "error_rate", json!(0.15));
    h.engine.evaluate_rule(&r).await.unwrap();

    h.advance_minutes(10);
    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::StillFiring
    ));
    assert_eq!(h.store.firing_alerts_for_rule(&r.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn high_error_rate_end_to_end() {
    let h = harness().await;
    seed_default_rules(h.store.as_ref()).await.unwrap();
    let rules = h.store.list_enabled().await.unwrap();
    let high = rules
        .iter()
        .find(|r| r.name == "High Error Rate")
        .unwrap()
        .clone();
    assert_eq!(high.condition, Condition::GreaterThan);
    assert_eq!(high.threshold, 0.1);
    assert_eq!(high.cooldown_minutes, 5);

    // t0: 0.12 fires alert A.
    h.executor.set_value(&high.query, "error_rate", json!(0.12));
    let summary = h.engine.evaluate_all().await.unwrap();
    assert_eq!(summary.evaluated, rules.len());
    assert_eq!(summary.fired, 1);
    assert_eq!(summary.failed, 0);
    let alerts = h.alerts(&high.id).await;
    assert_eq!(alerts.len(), 1);
    let a = alerts[0].clone();
    assert_eq!(a.fired_at, t0());
    assert!(a.is_firing());

    // t+1m: 0.13, cooldown active, no new alert.
    h.advance_minutes(1);
    h.executor.set_value(&high.query, "error_rate", json!(0.13));
    let summary = h.engine.evaluate_all().await.unwrap();
    assert_eq!(summary.fired, 0);
    assert_eq!(h.alerts(&high.id).await.len(), 1);

    // t+6m: 0.05 resolves A.
    h.advance_minutes(5);
    h.executor.set_value(&high.query, "error_rate", json!(0.05));
    let summary = h.engine.evaluate_all().await.unwrap();
    assert_eq!(summary.resolved, 1);
    let alerts = h.alerts(&high.id).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, a.id);
    assert_eq!(alerts[0].status, AlertStatus::Resolved);
    assert_eq!(alerts[0].resolved_at, Some(t0() + ChronoDuration::minutes(6)));
}

#[tokio::test]
async fn missing_null_or_non_numeric_metric_is_no_signal() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;
    h.executor.set_value("q", "error_rate", json!(0.5));
    h.engine.evaluate_rule(&r).await.unwrap();

    h.advance_minutes(10);
    for rows in [
        vec![],
        vec![json!({"other": 0.01})],
        vec![json!({"error_rate": null})],
        vec![json!({"error_rate": "n/a"})],
        vec![json!({"error_rate": [0.01]})],
    ] {
        h.executor.set("q", rows);
        assert!(matches!(
            h.engine.evaluate_rule(&r).await.unwrap(),
            RuleOutcome::NoSignal
        ));
    }
    // Still firing: no-signal never resolves.
    assert_eq!(h.store.firing_alerts_for_rule(&r.id).await.unwrap().len(), 1);

    h.executor.set("q", vec![json!({"error_rate": "0.02"})]);
    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::Resolved(1)
    ));
}

#[tokio::test]
async fn query_error_leaves_state_unchanged_and_other_rules_continue() {
    let h = harness().await;
    let broken = h.add_rule(rule("Broken", "q-broken")).await;
    let healthy = h.add_rule(rule("Healthy", "q-healthy")).await;

    h.executor.set_value("q-broken", "error_rate", json!(0.5));
    h.engine.evaluate_rule(&broken).await.unwrap();

    h.advance_minutes(10);
    h.executor.fail("q-broken");
    h.executor.set_value("q-healthy", "error_rate", json!(0.5));

    let err = h.engine.evaluate_rule(&broken).await.unwrap_err();
    assert!(matches!(err, EngineError::QueryExecution(_)), "{err}");

    let summary = h.engine.evaluate_all().await.unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.fired, 1);

    let broken_alerts = h.alerts(&broken.id).await;
    assert_eq!(broken_alerts.len(), 1);
    assert!(broken_alerts[0].is_firing());
    assert_eq!(h.alerts(&healthy.id).await.len(), 1);
}

#[tokio::test]
async fn rule_without_query_is_a_rule_evaluation_error() {
    let h = harness().await;
    let r = h.add_rule(rule("Empty", "  ")).await;
    let err = h.engine.evaluate_rule(&r).await.unwrap_err();
    assert!(matches!(err, EngineError::RuleEvaluation { .. }), "{err}");
    assert_eq!(h.executor.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_query_times_out() {
    let h = harness_with(
        FakeExecutor::with_delay(Duration::from_secs(120)),
        false,
        EngineConfig {
            query_timeout: Duration::from_secs(30),
        },
    )
    .await;
    let r = h.add_rule(rule("Slow", "q")).await;
    h.executor.set_value("q", "error_rate", json!(0.5));

    let err = h.engine.evaluate_rule(&r).await.unwrap_err();
    assert!(
        matches!(err, EngineError::QueryExecution(QueryExecutionError::Timeout(d)) if d == Duration::from_secs(30)),
        "{err}"
    );
    assert!(h.alerts(&r.id).await.is_empty());
}

#[tokio::test]
async fn unknown_condition_never_fires() {
    let h = harness().await;
    let mut r = rule("Odd", "q");
    r.condition = Condition::parse("greater_or_equal");
    let r = h.add_rule(r).await;
    h.executor.set_value("q", "error_rate", json!(99.0));

    assert!(matches!(
        h.engine.evaluate_rule(&r).await.unwrap(),
        RuleOutcome::Normal
    ));
    assert!(h.alerts(&r.id).await.is_empty());
}

#[tokio::test]
async fn failing_channel_does_not_block_others_and_marks_sent() {
    let h = harness_with(FakeExecutor::default(), true, EngineConfig::default()).await;
    let r = h.add_rule(rule("Errors", "q")).await;
    h.executor.set_value("q", "error_rate", json!(0.2));

    let RuleOutcome::Fired(alert) = h.engine.evaluate_rule(&r).await.unwrap() else {
        panic!("expected fire");
    };
    assert!(alert.notification_sent);
    let deliveries = h.deliveries.lock().unwrap().clone();
    assert_eq!(deliveries, vec![(ChannelType::Slack, alert.id.clone())]);
    assert!(h.alerts(&r.id).await[0].notification_sent);
}

#[tokio::test]
async fn cooldown_is_false_without_prior_alert_and_expires() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;
    let lifecycle = h.engine.lifecycle();
    assert!(!lifecycle.is_in_cooldown(&r).await.unwrap());

    lifecycle.fire(&r, 0.3).await.unwrap();
    assert!(lifecycle.is_in_cooldown(&r).await.unwrap());
    h.advance_minutes(4);
    assert!(lifecycle.is_in_cooldown(&r).await.unwrap());
    h.advance_minutes(1);
    assert!(!lifecycle.is_in_cooldown(&r).await.unwrap());

    let mut no_cooldown = r.clone();
    no_cooldown.cooldown_minutes = 0;
    assert!(!lifecycle.is_in_cooldown(&no_cooldown).await.unwrap());
}

#[tokio::test]
async fn resolve_handles_several_firing_alerts() {
    let h = harness().await;
    let r = h.add_rule(rule("Errors", "q")).await;
    for minutes in [10, 20] {
        let fired_at = t0() - ChronoDuration::minutes(minutes);
        h.store
            .insert_alert(&Alert {
                id: beacon_common::id::next_id(),
                rule_id: r.id.clone(),
                rule_name: r.name.clone(),
                severity: Severity::Critical,
                message: "legacy".to_string(),
                current_value: 1.0,
                threshold: 0.1,
                status: AlertStatus::Firing,
                fired_at,
                resolved_at: None,
                notification_sent: true,
                metadata: json!({}),
            })
            .await
            .unwrap();
    }

    assert_eq!(h.engine.lifecycle().resolve(&r.id).await.unwrap(), 2);
    let alerts = h.alerts(&r.id).await;
    assert!(alerts
        .iter()
        .all(|a| a.status == AlertStatus::Resolved && a.resolved_at == Some(h.clock.now())));
    assert_eq!(h.engine.lifecycle().resolve(&r.id).await.unwrap(), 0);
}

// ── Seeding ──

#[tokio::test]
async fn seeding_twice_updates_without_duplicates() {
    let store = MemoryStore::new();
    assert_eq!(seed_default_rules(&store).await.unwrap(), 5);
    let first = store.list_all().await.unwrap();
    assert_eq!(first.len(), default_rules().len());

    let high = first.iter().find(|r| r.name == "High Error Rate").unwrap();
    store.set_enabled(&high.id, false).await.unwrap();

    assert_eq!(seed_default_rules(&store).await.unwrap(), 5);
    let second = store.list_all().await.unwrap();
    assert_eq!(second.len(), first.len());
    for rule in &first {
        let again = second.iter().find(|r| r.name == rule.name).unwrap();
        assert_eq!(again.id, rule.id);
    }
    // A disabled default stays disabled.
    let high_again = second.iter().find(|r| r.name == "High Error Rate").unwrap();
    assert!(!high_again.enabled);
}

// ── Scheduler ──

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_until_stopped() {
    let h = harness().await;
    h.add_rule(rule("Errors", "q")).await;
    h.executor.set_value("q", "error_rate", json!(0.01));

    let handle = Scheduler::start(
        h.engine.clone(),
        SchedulerConfig {
            interval: Duration::from_secs(60),
            seed_default_rules: false,
        },
    )
    .await
    .unwrap();

    // Ticks at 0s, 60s and 120s.
    tokio::time::sleep(Duration::from_secs(150)).await;
    assert_eq!(h.executor.calls(), 3);
    assert!(handle.is_running());

    handle.stop().await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.executor.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn scheduler_keeps_ticking_after_failed_pass() {
    let rules = Arc::new(BrokenRuleStore::default());
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        ChannelRegistry::new(),
    ));
    let lifecycle = AlertLifecycleManager::new(
        store,
        dispatcher,
        Arc::new(ManualClock::new(t0())),
    );
    let engine = Arc::new(AlertEngine::new(
        rules.clone(),
        Arc::new(FakeExecutor::default()),
        lifecycle,
        EngineConfig::default(),
    ));

    let err = engine.evaluate_all().await.unwrap_err();
    assert!(matches!(err, EngineError::SchedulerTick(_)), "{err}");

    let handle = Scheduler::start(
        engine,
        SchedulerConfig {
            interval: Duration::from_secs(60),
            seed_default_rules: false,
        },
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_secs(150)).await;
    handle.stop().await;
    assert_eq!(rules.list_calls.load(Ordering::SeqCst), 1 + 3);
}

#[tokio::test(start_paused = true)]
async fn overlapping_pass_is_skipped() {
    let h = harness_with(
        FakeExecutor::with_delay(Duration::from_secs(5)),
        false,
        EngineConfig::default(),
    )
    .await;
    h.add_rule(rule("Errors", "q")).await;

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.try_evaluate_all().await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = h.engine.try_evaluate_all().await.unwrap();
    assert!(second.is_none());

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.map(|s| s.evaluated), Some(1));
    assert_eq!(h.executor.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduler_seeds_default_rules_before_first_tick() {
    let h = harness().await;
    let handle = Scheduler::start(h.engine.clone(), SchedulerConfig::default())
        .await
        .unwrap();
    assert_eq!(h.store.list_all().await.unwrap().len(), default_rules().len());
    handle.stop().await;
}
