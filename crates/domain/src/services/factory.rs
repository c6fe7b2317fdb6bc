//! Builds vehicle-bound rules from persisted rule definitions.

use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DomainError;
use crate::models::{AlertRuleDefinition, AlertRuleType, Geofence, GeofenceAction};
use crate::rules::{
    AlertRule, GenericAlertRule, GeofenceRule, IdleDurationSource, IdleTimeRule, MaxSpeedRule,
};

/// Default speed limit when a SPEED rule names none, in km/h.
pub const DEFAULT_SPEED_LIMIT_KMH: f64 = 80.0;

/// Default idle allowance when a TIME rule names none, in minutes.
pub const DEFAULT_MAX_IDLE_MINUTES: i64 = 30;

/// Read access to geofence definitions.
pub trait GeofenceLookup: Send + Sync {
    fn find_geofence(&self, geofence_id: &str) -> Option<Geofence>;
}

/// Geofence lookup backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeofenceLookup {
    geofences: HashMap<String, Geofence>,
}

impl InMemoryGeofenceLookup {
    pub fn new(geofences: impl IntoIterator<Item = Geofence>) -> Self {
        Self {
            geofences: geofences
                .into_iter()
                .map(|g| (g.geofence_id.clone(), g))
                .collect(),
        }
    }

    pub fn insert(&mut self, geofence: Geofence) {
        self.geofences.insert(geofence.geofence_id.clone(), geofence);
    }

    pub fn len(&self) -> usize {
        self.geofences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geofences.is_empty()
    }
}

impl GeofenceLookup for InMemoryGeofenceLookup {
    fn find_geofence(&self, geofence_id: &str) -> Option<Geofence> {
        self.geofences.get(geofence_id).cloned()
    }
}

/// Turns rule definitions into concrete rules bound to one vehicle.
#[derive(Clone)]
pub struct AlertRuleFactory {
    geofences: Arc<dyn GeofenceLookup>,
    idle_source: Arc<dyn IdleDurationSource>,
}

impl AlertRuleFactory {
    pub fn new(geofences: Arc<dyn GeofenceLookup>, idle_source: Arc<dyn IdleDurationSource>) -> Self {
        Self {
            geofences,
            idle_source,
        }
    }

    /// Creates the rule `definition` describes for `vehicle_id`.
    ///
    /// Returns `None` when the definition is disabled, does not list the
    /// vehicle, or (for geofence rules) references a geofence that is missing,
    /// inactive, or not assigned to the vehicle. Malformed parameters fall back
    /// to their defaults.
    pub fn create_domain_rule(
        &self,
        definition: &AlertRuleDefinition,
        vehicle_id: &str,
    ) -> Option<AlertRule> {
        if !definition.enabled || !definition.applies_to_vehicle(vehicle_id) {
            return None;
        }

        let rule: AlertRule = match definition.rule_type {
            AlertRuleType::Speed => self.create_max_speed_rule(definition).into(),
            AlertRuleType::Time => self.create_idle_time_rule(definition).into(),
            AlertRuleType::Geofence => self.create_geofence_rule(definition, vehicle_id)?.into(),
            _ => self.create_generic_rule(definition).into(),
        };

        tracing::debug!(
            rule_key = %definition.rule_key,
            rule_type = %definition.rule_type,
            vehicle_id = %vehicle_id,
            "Created domain rule"
        );

        Some(rule)
    }

    fn create_max_speed_rule(&self, definition: &AlertRuleDefinition) -> MaxSpeedRule {
        let speed_limit = definition
            .float_param("speedLimit")
            .unwrap_or(DEFAULT_SPEED_LIMIT_KMH);
        MaxSpeedRule::with_name(&definition.rule_key, &definition.rule_name, speed_limit)
    }

    fn create_idle_time_rule(&self, definition: &AlertRuleDefinition) -> IdleTimeRule {
        // negative or out-of-range minutes count as malformed
        let max_idle = definition
            .int_param("maxIdleMinutes")
            .filter(|minutes| *minutes >= 0)
            .and_then(Duration::try_minutes)
            .unwrap_or_else(|| Duration::minutes(DEFAULT_MAX_IDLE_MINUTES));
        IdleTimeRule::new(
            &definition.rule_key,
            &definition.rule_name,
            max_idle,
            Arc::clone(&self.idle_source),
        )
    }

    fn create_geofence_rule(
        &self,
        definition: &AlertRuleDefinition,
        vehicle_id: &str,
    ) -> Option<GeofenceRule> {
        let geofence_id = definition.string_param("geofenceId").unwrap_or_default();
        let action = definition
            .string_param("action")
            .map(|a| GeofenceAction::parse_lenient(&a))
            .unwrap_or_default();

        let geofence = match self.active_geofence(&geofence_id) {
            Some(g) => g,
            None => {
                tracing::warn!(
                    geofence_id = %geofence_id,
                    rule_key = %definition.rule_key,
                    "Geofence not found"
                );
                return None;
            }
        };

        if !geofence.has_vehicle(vehicle_id) {
            tracing::debug!(
                geofence_id = %geofence_id,
                vehicle_id = %vehicle_id,
                "Geofence does not apply to vehicle"
            );
            return None;
        }

        Some(GeofenceRule::new(
            &definition.rule_key,
            &definition.rule_name,
            geofence_id,
            geofence.boundary_points(),
            action,
            definition.priority,
        ))
    }

    fn create_generic_rule(&self, definition: &AlertRuleDefinition) -> GenericAlertRule {
        GenericAlertRule::new(
            &definition.rule_key,
            &definition.rule_name,
            definition.rule_type,
            definition.priority,
            definition.parameters.clone(),
        )
    }

    fn active_geofence(&self, geofence_id: &str) -> Option<Geofence> {
        if geofence_id.is_empty() {
            return None;
        }
        self.geofences
            .find_geofence(geofence_id)
            .filter(|g| g.is_active)
    }

    /// Checks that a geofence rule definition can be bound at all.
    pub fn validate_geofence_rule(&self, definition: &AlertRuleDefinition) -> Result<(), DomainError> {
        let invalid = |detail: String| DomainError::InvalidConfiguration {
            rule_key: definition.rule_key.clone(),
            detail,
        };

        let geofence_id = definition
            .string_param("geofenceId")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| invalid("Geofence ID is required".to_string()))?;

        match self.geofences.find_geofence(&geofence_id) {
            None => return Err(invalid(format!("Geofence not found: {}", geofence_id))),
            Some(g) if !g.is_active => {
                return Err(invalid(format!("Geofence is not active: {}", geofence_id)))
            }
            Some(_) => {}
        }

        if definition.vehicle_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(invalid("At least one vehicle must be specified".to_string()));
        }

        Ok(())
    }
}

impl std::fmt::Debug for AlertRuleFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertRuleFactory").finish_non_exhaustive()
    }
}
