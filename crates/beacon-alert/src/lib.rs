//! Rule evaluation, alert lifecycle and periodic scheduling.
//!
//! Each pass lists the enabled rules, runs every rule's query through a
//! [`beacon_storage::telemetry::MetricQueryExecutor`], compares the result
//! to the rule's threshold and fires or resolves alerts through the
//! [`lifecycle::AlertLifecycleManager`]. A fired alert is fanned out by the
//! [`beacon_notify::NotificationDispatcher`]. The [`scheduler::Scheduler`]
//! drives passes on a fixed interval.

pub mod defaults;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use engine::{AlertEngine, EngineConfig, PassSummary, RuleOutcome};
pub use error::{EngineError, Result};
pub use lifecycle::AlertLifecycleManager;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
