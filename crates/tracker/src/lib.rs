//! Fleet tracker service library.
//!
//! Ingests vehicle telemetry, keeps the per-vehicle state machines and runs
//! each sample through the vehicle's alert rules.

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod registry;
