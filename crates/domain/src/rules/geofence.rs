//! Geofence entry/exit rule.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{format_coordinates, RuleMeta};
use crate::error::DomainError;
use crate::geometry::{self, GeoPoint};
use crate::models::{AlertEvent, AlertSeverity, GeofenceAction, LocationPoint};

/// Detects boundary transitions of a polygonal geofence.
///
/// Containment of the previous sample is remembered per vehicle, so one rule
/// instance can be evaluated for several vehicles without mixing their edge
/// state. A vehicle with no previous sample counts as outside. The remembered
/// state is updated on every evaluation of an enabled rule with a usable
/// boundary, whether or not the action alerts on that transition.
#[derive(Debug)]
pub struct GeofenceRule {
    pub(super) meta: RuleMeta,
    geofence_id: String,
    boundary: Vec<GeoPoint>,
    action: GeofenceAction,
    was_inside: Mutex<HashMap<String, bool>>,
}

impl GeofenceRule {
    pub fn new(
        rule_key: impl Into<String>,
        rule_name: impl Into<String>,
        geofence_id: impl Into<String>,
        boundary: Vec<GeoPoint>,
        action: GeofenceAction,
        priority: i32,
    ) -> Self {
        Self {
            meta: RuleMeta::new(rule_key, rule_name, priority),
            geofence_id: geofence_id.into(),
            boundary,
            action,
            was_inside: Mutex::new(HashMap::new()),
        }
    }

    pub fn geofence_id(&self) -> &str {
        &self.geofence_id
    }

    pub fn boundary(&self) -> &[GeoPoint] {
        &self.boundary
    }

    pub fn action(&self) -> GeofenceAction {
        self.action
    }

    pub fn evaluate(
        &self,
        vehicle_id: &str,
        location: &LocationPoint,
    ) -> Result<Option<AlertEvent>, DomainError> {
        if !self.meta.is_enabled() || self.boundary.len() < 3 {
            return Ok(None);
        }

        let is_inside =
            geometry::point_in_polygon(location.latitude, location.longitude, &self.boundary);

        let was_inside = {
            let mut state = self.was_inside.lock().map_err(|_| DomainError::Evaluation {
                rule_key: self.meta.rule_key().to_string(),
                detail: "geofence state lock poisoned".to_string(),
            })?;
            state
                .insert(vehicle_id.to_string(), is_inside)
                .unwrap_or(false)
        };

        let alert = match (was_inside, is_inside) {
            (false, true) if self.action.alerts_on_entry() => {
                Some(self.create_alert(vehicle_id, location, "entered", AlertSeverity::Info))
            }
            (true, false) if self.action.alerts_on_exit() => {
                Some(self.create_alert(vehicle_id, location, "exited", AlertSeverity::Warning))
            }
            _ => None,
        };

        Ok(alert)
    }

    fn create_alert(
        &self,
        vehicle_id: &str,
        location: &LocationPoint,
        transition: &str,
        severity: AlertSeverity,
    ) -> AlertEvent {
        let message = format!(
            "Vehicle {} {} geofence {} at {}",
            vehicle_id,
            transition,
            self.geofence_id,
            format_coordinates(location.latitude, location.longitude)
        );

        AlertEvent::new(
            self.meta.rule_key(),
            vehicle_id,
            message,
            severity,
            location.clone(),
        )
    }
}
