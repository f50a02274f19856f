use beacon_common::types::{Alert, AlertRule};
use beacon_storage::telemetry::{metric_value, MetricQueryExecutor, QueryExecutionError};
use beacon_storage::RuleStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{EngineError, Result};
use crate::lifecycle::AlertLifecycleManager;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one rule's telemetry query.
    pub query_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// What one rule evaluation did.
#[derive(Debug, Clone)]
pub enum RuleOutcome {
    Fired(Alert),
    Resolved(usize),
    /// Condition true but an alert is already firing.
    StillFiring,
    /// Condition true but the rule fired within its cooldown.
    Suppressed,
    /// Condition false and nothing to resolve.
    Normal,
    /// The query yielded no usable value for the metric.
    NoSignal,
}

/// Counts from one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Evaluates enabled rules against telemetry.
///
/// Rules in a pass run one after another; a failing rule is logged and
/// the rest continue. Only one pass runs at a time per engine.
pub struct AlertEngine {
    rules: Arc<dyn RuleStore>,
    executor: Arc<dyn MetricQueryExecutor>,
    lifecycle: AlertLifecycleManager,
    config: EngineConfig,
    pass_lock: Mutex<()>,
}

impl AlertEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        executor: Arc<dyn MetricQueryExecutor>,
        lifecycle: AlertLifecycleManager,
        config: EngineConfig,
    ) -> Self {
        Self {
            rules,
            executor,
            lifecycle,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn rule_store(&self) -> &Arc<dyn RuleStore> {
        &self.rules
    }

    pub fn lifecycle(&self) -> &AlertLifecycleManager {
        &self.lifecycle
    }

    /// Runs one pass unless another pass is still in progress.
    ///
    /// Returns `Ok(None)` when the pass was skipped because the engine is busy.
    pub async fn try_evaluate_all(&self) -> Result<Option<PassSummary>> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            tracing::warn!("Previous evaluation pass still running, skipping tick");
            return Ok(None);
        };
        self.evaluate_pass().await.map(Some)
    }

    /// Runs one pass, waiting for any pass already in progress.
    pub async fn evaluate_all(&self) -> Result<PassSummary> {
        let _guard = self.pass_lock.lock().await;
        self.evaluate_pass().await
    }

    async fn evaluate_pass(&self) -> Result<PassSummary> {
        let rules = self
            .rules
            .list_enabled()
            .await
            .map_err(|e| EngineError::SchedulerTick(format!("listing enabled rules: {e}")))?;

        let mut summary = PassSummary::default();
        for rule in rules.iter().filter(|r| r.enabled) {
            summary.evaluated += 1;
            match self.evaluate_rule(rule).await {
                Ok(RuleOutcome::Fired(_)) => summary.fired += 1,
                Ok(RuleOutcome::Resolved(n)) => summary.resolved += n,
                Ok(_) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        error = %e,
                        "Rule evaluation failed"
                    );
                }
            }
        }

        tracing::debug!(
            evaluated = summary.evaluated,
            fired = summary.fired,
            resolved = summary.resolved,
            failed = summary.failed,
            "Evaluation pass complete"
        );
        Ok(summary)
    }

    /// Evaluates a single rule and applies the resulting transition.
    ///
    /// The query always runs so that a firing alert can resolve during
    /// cooldown. Cooldown only blocks a new fire.
    pub async fn evaluate_rule(&self, rule: &AlertRule) -> Result<RuleOutcome> {
        if !rule.enabled {
            return Ok(RuleOutcome::Normal);
        }
        if rule.query.trim().is_empty() {
            return Err(EngineError::RuleEvaluation {
                rule_id: rule.id.clone(),
                message: "rule has no query".to_string(),
            });
        }
        let in_cooldown = self.lifecycle.is_in_cooldown(rule).await?;

        let rows = tokio::time::timeout(self.config.query_timeout, self.executor.run(&rule.query))
            .await
            .map_err(|_| QueryExecutionError::Timeout(self.config.query_timeout))??;

        let Some(value) = metric_value(&rows, &rule.metric) else {
            tracing::debug!(rule_id = %rule.id, metric = %rule.metric, "No signal for metric");
            return Ok(RuleOutcome::NoSignal);
        };

        if rule.condition.evaluate(value, rule.threshold) {
            if self.lifecycle.has_firing_alert(&rule.id).await? {
                return Ok(RuleOutcome::StillFiring);
            }
            if in_cooldown {
                tracing::debug!(rule_id = %rule.id, value, "Alert suppressed (cooldown)");
                return Ok(RuleOutcome::Suppressed);
            }
            let alert = self.lifecycle.fire(rule, value).await?;
            Ok(RuleOutcome::Fired(alert))
        } else {
            match self.lifecycle.resolve(&rule.id).await? {
                0 => Ok(RuleOutcome::Normal),
                n => Ok(RuleOutcome::Resolved(n)),
            }
        }
    }
}
