//! Speed limit rule.

use super::{format_coordinates, RuleMeta};
use crate::models::{AlertEvent, AlertSeverity, LocationPoint};

/// Triggers when a sample's speed exceeds a fixed limit.
#[derive(Debug)]
pub struct MaxSpeedRule {
    pub(super) meta: RuleMeta,
    threshold_kmh: f64,
}

impl MaxSpeedRule {
    pub const PRIORITY: i32 = 2;
    pub const DEFAULT_NAME: &'static str = "MAX_SPEED_RULE";
    /// Speeds above `threshold * CRITICAL_FACTOR` are critical.
    pub const CRITICAL_FACTOR: f64 = 1.5;

    pub fn new(rule_key: impl Into<String>, threshold_kmh: f64) -> Self {
        Self::with_name(rule_key, Self::DEFAULT_NAME, threshold_kmh)
    }

    pub fn with_name(
        rule_key: impl Into<String>,
        rule_name: impl Into<String>,
        threshold_kmh: f64,
    ) -> Self {
        Self {
            meta: RuleMeta::new(rule_key, rule_name, Self::PRIORITY),
            threshold_kmh,
        }
    }

    pub fn threshold_kmh(&self) -> f64 {
        self.threshold_kmh
    }

    pub fn evaluate(&self, vehicle_id: &str, location: &LocationPoint) -> Option<AlertEvent> {
        if !self.meta.is_enabled() || vehicle_id.is_empty() {
            return None;
        }

        let speed = location.speed_kmh;
        if speed <= self.threshold_kmh || speed.is_nan() {
            return None;
        }

        let severity = if speed > self.threshold_kmh * Self::CRITICAL_FACTOR {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };

        let message = format!(
            "Vehicle {} exceeded speed limit of {:.1} km/h. Current speed: {:.1} km/h at {}",
            vehicle_id,
            self.threshold_kmh,
            speed,
            format_coordinates(location.latitude, location.longitude)
        );

        Some(AlertEvent::new(
            self.meta.rule_key(),
            vehicle_id,
            message,
            severity,
            location.clone(),
        ))
    }
}
