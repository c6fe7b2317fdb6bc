//! Shared utilities and common types for the fleet tracker.
//!
//! This crate provides functionality used across the other crates:
//! - Coordinate and speed validation for telemetry samples
//! - Alert rule configuration validation (rule key pattern, priority range)

pub mod validation;
