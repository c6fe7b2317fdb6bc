//! Alert rule definition read model.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Kind of alert rule, selecting the evaluation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertRuleType {
    Speed,
    Geofence,
    Time,
    DeviceStatus,
    VehicleStatus,
    Safety,
    BusinessRule,
    Custom,
}

impl AlertRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertRuleType::Speed => "SPEED",
            AlertRuleType::Geofence => "GEOFENCE",
            AlertRuleType::Time => "TIME",
            AlertRuleType::DeviceStatus => "DEVICE_STATUS",
            AlertRuleType::VehicleStatus => "VEHICLE_STATUS",
            AlertRuleType::Safety => "SAFETY",
            AlertRuleType::BusinessRule => "BUSINESS_RULE",
            AlertRuleType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for AlertRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default enabled status for rule definitions.
fn default_enabled() -> bool {
    true
}

/// Default priority for rule definitions.
fn default_priority() -> i32 {
    5
}

/// A persisted alert rule, not yet bound to a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRuleDefinition {
    pub rule_key: String,
    pub rule_name: String,
    pub rule_type: AlertRuleType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub vehicle_ids: HashSet<String>,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl AlertRuleDefinition {
    pub fn new(
        rule_key: impl Into<String>,
        rule_name: impl Into<String>,
        rule_type: AlertRuleType,
    ) -> Self {
        Self {
            rule_key: rule_key.into(),
            rule_name: rule_name.into(),
            rule_type,
            enabled: true,
            priority: default_priority(),
            vehicle_ids: HashSet::new(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_ids.insert(vehicle_id.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn applies_to_vehicle(&self, vehicle_id: &str) -> bool {
        self.vehicle_ids.contains(vehicle_id)
    }

    /// Reads a numeric parameter; numbers and numeric strings are accepted.
    pub fn float_param(&self, key: &str) -> Option<f64> {
        match self.parameters.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Reads an integer parameter; fractional numbers are truncated, strings must be integral.
    pub fn int_param(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key)? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Reads a parameter as text; numbers and booleans are rendered.
    pub fn string_param(&self, key: &str) -> Option<String> {
        match self.parameters.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
