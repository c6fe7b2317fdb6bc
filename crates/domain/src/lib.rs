//! Domain layer for the fleet tracker.
//!
//! This crate contains:
//! - Geometry helpers (haversine distance, circle and polygon containment)
//! - Domain models (LocationPoint, Vehicle, Trip, Geofence, AlertEvent)
//! - Alert rule variants and the factory that binds rule definitions to vehicles
//! - The alerting engine, its evaluation service and event publishers
//! - Domain error types

pub mod error;
pub mod geometry;
pub mod models;
pub mod rules;
pub mod services;

pub use error::DomainError;
