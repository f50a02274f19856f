//! Shared domain types for the beacon alerting engine: rules, alerts,
//! notification channel records, identifiers and the clock abstraction.

pub mod clock;
pub mod id;
pub mod text;
pub mod types;
