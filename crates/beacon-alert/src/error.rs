use beacon_storage::telemetry::QueryExecutionError;
use beacon_storage::StorageError;

/// Failures raised while evaluating rules.
///
/// Containment runs channel < rule < pass: a rule-level error skips that
/// rule for the tick, a pass-level error skips the tick. Neither stops the
/// scheduler.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    QueryExecution(#[from] QueryExecutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Any other failure confined to one rule.
    #[error("Engine: evaluation of rule '{rule_id}' failed: {message}")]
    RuleEvaluation { rule_id: String, message: String },

    /// The pass itself could not run, e.g. rules could not be listed.
    #[error("Engine: scheduler tick failed: {0}")]
    SchedulerTick(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
