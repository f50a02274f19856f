use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::AlertEngine;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Upsert the built-in rules before the first tick.
    pub seed_default_rules: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            seed_default_rules: true,
        }
    }
}

/// Drives [`AlertEngine`] passes on a fixed interval.
pub struct Scheduler;

impl Scheduler {
    /// Seeds the default rules (if configured), then spawns the tick loop.
    ///
    /// The first pass runs immediately. A tick that falls due while a pass
    /// is still running is skipped.
    ///
    /// # Errors
    ///
    /// Fails only if seeding fails; nothing is spawned in that case.
    pub async fn start(engine: Arc<AlertEngine>, config: SchedulerConfig) -> Result<SchedulerHandle> {
        if config.seed_default_rules {
            crate::defaults::seed_default_rules(engine.rule_store().as_ref()).await?;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = config.interval;
        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = period.as_secs(), "Alert scheduler started");
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tick.tick() => {}
                }
                let started = tokio::time::Instant::now();
                match engine.try_evaluate_all().await {
                    Ok(Some(summary)) => {
                        if summary.fired > 0 || summary.resolved > 0 || summary.failed > 0 {
                            tracing::info!(
                                evaluated = summary.evaluated,
                                fired = summary.fired,
                                resolved = summary.resolved,
                                failed = summary.failed,
                                "Evaluation pass finished"
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Evaluation pass failed");
                    }
                }
                let elapsed = started.elapsed();
                if elapsed > period {
                    tracing::warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        interval_secs = period.as_secs(),
                        "Evaluation pass overran the interval, missed ticks skipped"
                    );
                }
            }
            tracing::info!("Alert scheduler stopped");
        });

        Ok(SchedulerHandle { stop_tx, task })
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Prevents further ticks and waits for the loop to exit. A pass that
    /// is already running completes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Alert scheduler task panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
