//! Alert event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::location::LocationPoint;

/// Severity of a triggered alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alert produced by a rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub rule_key: String,
    pub vehicle_id: String,
    pub message: String,
    pub severity: AlertSeverity,
    /// Creation time of the event, not of the triggering sample.
    pub timestamp: DateTime<Utc>,
    pub location: LocationPoint,
}

impl AlertEvent {
    pub fn new(
        rule_key: impl Into<String>,
        vehicle_id: impl Into<String>,
        message: impl Into<String>,
        severity: AlertSeverity,
        location: LocationPoint,
    ) -> Self {
        Self {
            rule_key: rule_key.into(),
            vehicle_id: vehicle_id.into(),
            message: message.into(),
            severity,
            timestamp: Utc::now(),
            location,
        }
    }
}
