//! Location domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::geometry;

/// A single telemetry sample reported by a tracked vehicle.
///
/// Produced by the protocol layer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LocationPoint {
    /// Creates a sample without metadata.
    pub fn new(latitude: f64, longitude: f64, speed_kmh: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            speed_kmh,
            timestamp,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true when latitude, longitude and speed are all within bounds.
    pub fn is_valid(&self) -> bool {
        shared::validation::validate_latitude(self.latitude).is_ok()
            && shared::validation::validate_longitude(self.longitude).is_ok()
            && shared::validation::validate_speed(self.speed_kmh).is_ok()
    }

    /// Great-circle distance to another sample in kilometres.
    pub fn distance_to(&self, other: &LocationPoint) -> f64 {
        geometry::haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}
