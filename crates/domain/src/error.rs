//! Domain error types.

use thiserror::Error;

/// Errors raised by the vehicle state machine, rule registration and rule
/// evaluation.
///
/// Every variant carries a stable machine-readable code (see [`DomainError::code`])
/// next to its human-readable message. "No alert" is never an error; rule
/// evaluation signals it with `None`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid location data provided")]
    InvalidLocation,

    #[error("Vehicle '{vehicle_id}' already has an active trip")]
    TripAlreadyActive { vehicle_id: String },

    #[error("Vehicle '{vehicle_id}' does not have an active trip")]
    TripNotActive { vehicle_id: String },

    #[error("Cannot cut fuel while moving at {speed_kmh:.1} km/h. Maximum allowed: {max_kmh:.0} km/h")]
    FuelCutWhileMoving { speed_kmh: f64, max_kmh: f64 },

    #[error("Fuel cut is already active for vehicle '{vehicle_id}'")]
    FuelCutAlreadyActive { vehicle_id: String },

    #[error("Alert rule cannot be null")]
    RuleIsNull,

    #[error("Alert rule with key '{rule_key}' already exists")]
    RuleAlreadyExists { rule_key: String },

    #[error("Alert rule with key '{rule_key}' not found")]
    RuleNotFound { rule_key: String },

    #[error("Invalid configuration for rule '{rule_key}': {detail}")]
    InvalidConfiguration { rule_key: String, detail: String },

    #[error("Error evaluating rule '{rule_key}': {detail}")]
    Evaluation { rule_key: String, detail: String },

    #[error("Rule '{rule_key}' failed: {source}")]
    RuleFailed {
        rule_key: String,
        #[source]
        source: Box<DomainError>,
    },

    #[error("Failed to publish alert: {0}")]
    PublishFailed(String),
}

impl DomainError {
    /// Returns the stable error code for this error.
    ///
    /// A [`DomainError::RuleFailed`] reports the code of the wrapped error.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidInput(_) => "ALERT_INVALID_INPUT",
            DomainError::InvalidLocation => "VEHICLE_INVALID_LOCATION",
            DomainError::TripAlreadyActive { .. } => "TRIP_ALREADY_ACTIVE",
            DomainError::TripNotActive { .. } => "TRIP_NOT_ACTIVE",
            DomainError::FuelCutWhileMoving { .. } => "VEHICLE_FUEL_CUT_MOVING",
            DomainError::FuelCutAlreadyActive { .. } => "VEHICLE_FUEL_CUT_ACTIVE",
            DomainError::RuleIsNull => "ALERT_RULE_NULL",
            DomainError::RuleAlreadyExists { .. } => "ALERT_RULE_EXISTS",
            DomainError::RuleNotFound { .. } => "ALERT_RULE_NOT_FOUND",
            DomainError::InvalidConfiguration { .. } => "ALERT_INVALID_CONFIG",
            DomainError::Evaluation { .. } => "ALERT_EVALUATION_ERROR",
            DomainError::RuleFailed { source, .. } => source.code(),
            DomainError::PublishFailed(_) => "ALERT_PUBLISH_FAILED",
        }
    }

    /// Returns the key of the rule this error is attributed to, if any.
    pub fn rule_key(&self) -> Option<&str> {
        match self {
            DomainError::RuleAlreadyExists { rule_key }
            | DomainError::RuleNotFound { rule_key }
            | DomainError::InvalidConfiguration { rule_key, .. }
            | DomainError::Evaluation { rule_key, .. }
            | DomainError::RuleFailed { rule_key, .. } => Some(rule_key),
            _ => None,
        }
    }

    /// Attaches the identity of the rule that produced this error.
    ///
    /// Errors that already name a rule are returned unchanged.
    pub fn for_rule(self, rule_key: &str) -> DomainError {
        if self.rule_key().is_some() {
            return self;
        }
        DomainError::RuleFailed {
            rule_key: rule_key.to_string(),
            source: Box::new(self),
        }
    }
}
