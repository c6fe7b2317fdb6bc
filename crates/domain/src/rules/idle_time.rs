//! Idle time rule.

use chrono::Duration;
use std::fmt;
use std::sync::Arc;

use super::{format_coordinates, RuleMeta};
use crate::models::{AlertEvent, AlertSeverity, LocationPoint};

/// Supplies how long a vehicle has currently been idle.
///
/// Returns `None` when the vehicle is unknown to the source.
pub trait IdleDurationSource: Send + Sync {
    fn idle_duration(&self, vehicle_id: &str) -> Option<Duration>;
}

impl<F> IdleDurationSource for F
where
    F: Fn(&str) -> Option<Duration> + Send + Sync,
{
    fn idle_duration(&self, vehicle_id: &str) -> Option<Duration> {
        self(vehicle_id)
    }
}

/// Triggers an INFO alert when a vehicle stays idle longer than allowed.
pub struct IdleTimeRule {
    pub(super) meta: RuleMeta,
    max_idle: Duration,
    source: Arc<dyn IdleDurationSource>,
}

impl IdleTimeRule {
    pub const PRIORITY: i32 = 1;

    pub fn new(
        rule_key: impl Into<String>,
        rule_name: impl Into<String>,
        max_idle: Duration,
        source: Arc<dyn IdleDurationSource>,
    ) -> Self {
        Self {
            meta: RuleMeta::new(rule_key, rule_name, Self::PRIORITY),
            max_idle,
            source,
        }
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    pub fn evaluate(&self, vehicle_id: &str, location: &LocationPoint) -> Option<AlertEvent> {
        if !self.meta.is_enabled() || vehicle_id.is_empty() {
            return None;
        }

        let idle = self.source.idle_duration(vehicle_id)?;
        if idle <= self.max_idle {
            return None;
        }

        let message = format!(
            "Vehicle {} has been idle for {} minutes (max allowed: {} minutes) at {}",
            vehicle_id,
            idle.num_minutes(),
            self.max_idle.num_minutes(),
            format_coordinates(location.latitude, location.longitude)
        );

        Some(AlertEvent::new(
            self.meta.rule_key(),
            vehicle_id,
            message,
            AlertSeverity::Info,
            location.clone(),
        ))
    }
}

impl fmt::Debug for IdleTimeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleTimeRule")
            .field("meta", &self.meta)
            .field("max_idle", &self.max_idle)
            .finish_non_exhaustive()
    }
}
