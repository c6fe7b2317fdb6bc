//! Alert rule variants.
//!
//! The set of rule kinds is closed: [`AlertRule`] is a sum type over the
//! concrete rules, and every capability dispatches with a single `match`.
//! Rules are shared behind `Arc` between engine snapshots, so any state they
//! mutate during evaluation (the enabled flag, geofence edge state) uses
//! interior mutability.

pub mod generic;
pub mod geofence;
pub mod idle_time;
pub mod max_speed;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DomainError;
use crate::models::{AlertEvent, LocationPoint};

pub use generic::GenericAlertRule;
pub use geofence::GeofenceRule;
pub use idle_time::{IdleDurationSource, IdleTimeRule};
pub use max_speed::MaxSpeedRule;

/// Identity and scheduling attributes shared by every rule variant.
#[derive(Debug)]
pub struct RuleMeta {
    rule_key: String,
    rule_name: String,
    priority: i32,
    enabled: AtomicBool,
}

impl RuleMeta {
    pub fn new(rule_key: impl Into<String>, rule_name: impl Into<String>, priority: i32) -> Self {
        Self {
            rule_key: rule_key.into(),
            rule_name: rule_name.into(),
            priority,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn rule_key(&self) -> &str {
        &self.rule_key
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// A concrete alert rule bound to its configuration.
#[derive(Debug)]
pub enum AlertRule {
    MaxSpeed(MaxSpeedRule),
    IdleTime(IdleTimeRule),
    Geofence(GeofenceRule),
    Generic(GenericAlertRule),
}

impl AlertRule {
    fn meta(&self) -> &RuleMeta {
        match self {
            AlertRule::MaxSpeed(rule) => &rule.meta,
            AlertRule::IdleTime(rule) => &rule.meta,
            AlertRule::Geofence(rule) => &rule.meta,
            AlertRule::Generic(rule) => &rule.meta,
        }
    }

    pub fn rule_key(&self) -> &str {
        self.meta().rule_key()
    }

    pub fn rule_name(&self) -> &str {
        self.meta().rule_name()
    }

    pub fn priority(&self) -> i32 {
        self.meta().priority()
    }

    pub fn is_enabled(&self) -> bool {
        self.meta().is_enabled()
    }

    /// Toggles the rule; takes effect for evaluations starting afterwards.
    pub fn set_enabled(&self, enabled: bool) {
        self.meta().set_enabled(enabled)
    }

    /// Short name of the variant, used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AlertRule::MaxSpeed(_) => "max_speed",
            AlertRule::IdleTime(_) => "idle_time",
            AlertRule::Geofence(_) => "geofence",
            AlertRule::Generic(_) => "generic",
        }
    }

    /// Evaluates the rule for one telemetry sample.
    ///
    /// `Ok(None)` means the rule did not trigger; disabled rules never trigger.
    pub fn evaluate(
        &self,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<Option<AlertEvent>, DomainError> {
        match self {
            AlertRule::MaxSpeed(rule) => Ok(rule.evaluate(vehicle_id, location)),
            AlertRule::IdleTime(rule) => Ok(rule.evaluate(vehicle_id, location)),
            AlertRule::Geofence(rule) => rule.evaluate(vehicle_id, location),
            AlertRule::Generic(rule) => Ok(rule.evaluate(vehicle_id, location)),
        }
    }
}

impl From<MaxSpeedRule> for AlertRule {
    fn from(rule: MaxSpeedRule) -> Self {
        AlertRule::MaxSpeed(rule)
    }
}

impl From<IdleTimeRule> for AlertRule {
    fn from(rule: IdleTimeRule) -> Self {
        AlertRule::IdleTime(rule)
    }
}

impl From<GeofenceRule> for AlertRule {
    fn from(rule: GeofenceRule) -> Self {
        AlertRule::Geofence(rule)
    }
}

impl From<GenericAlertRule> for AlertRule {
    fn from(rule: GenericAlertRule) -> Self {
        AlertRule::Generic(rule)
    }
}

/// Formats coordinates the way every alert message embeds them.
pub(crate) fn format_coordinates(latitude: f64, longitude: f64) -> String {
    format!("[{:.6}, {:.6}]", latitude, longitude)
}
