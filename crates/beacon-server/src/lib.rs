//! Process wiring for the beacon alerting engine: configuration, seeding
//! and assembly of the store, telemetry executor, dispatcher and engine.

pub mod app;
pub mod channel_seed;
pub mod config;
pub mod rule_seed;
