//! Geofence domain model.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::geometry::{self, GeoPoint};

/// Shape of a geofence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shapeType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceShape {
    #[serde(rename_all = "camelCase")]
    Circle {
        center_latitude: f64,
        center_longitude: f64,
        radius_meters: f64,
    },
    #[serde(rename_all = "camelCase")]
    Polygon { points: Vec<GeoPoint> },
}

/// A named spatial region read from the geofence catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub geofence_id: String,
    pub name: String,
    #[serde(flatten)]
    pub shape: GeofenceShape,
    #[serde(default)]
    pub vehicle_ids: HashSet<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Default active status for catalog geofences.
fn default_active() -> bool {
    true
}

impl Geofence {
    pub fn circle(
        geofence_id: impl Into<String>,
        name: impl Into<String>,
        center_latitude: f64,
        center_longitude: f64,
        radius_meters: f64,
    ) -> Self {
        Self {
            geofence_id: geofence_id.into(),
            name: name.into(),
            shape: GeofenceShape::Circle {
                center_latitude,
                center_longitude,
                radius_meters,
            },
            vehicle_ids: HashSet::new(),
            is_active: true,
        }
    }

    pub fn polygon(
        geofence_id: impl Into<String>,
        name: impl Into<String>,
        points: Vec<GeoPoint>,
    ) -> Self {
        Self {
            geofence_id: geofence_id.into(),
            name: name.into(),
            shape: GeofenceShape::Polygon { points },
            vehicle_ids: HashSet::new(),
            is_active: true,
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_ids.insert(vehicle_id.into());
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn has_vehicle(&self, vehicle_id: &str) -> bool {
        self.vehicle_ids.contains(vehicle_id)
    }

    /// Boundary as an ordered polygon; circles are expanded to a 12-point approximation.
    pub fn boundary_points(&self) -> Vec<GeoPoint> {
        match &self.shape {
            GeofenceShape::Circle {
                center_latitude,
                center_longitude,
                radius_meters,
            } => geometry::circle_to_polygon(*center_latitude, *center_longitude, *radius_meters),
            GeofenceShape::Polygon { points } => points.clone(),
        }
    }
}

/// Transition a geofence rule alerts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeofenceAction {
    Entry,
    Exit,
    #[default]
    Both,
}

impl GeofenceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceAction::Entry => "ENTRY",
            GeofenceAction::Exit => "EXIT",
            GeofenceAction::Both => "BOTH",
        }
    }

    /// Case-insensitive parse; anything unrecognised means BOTH.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTRY" => GeofenceAction::Entry,
            "EXIT" => GeofenceAction::Exit,
            _ => GeofenceAction::Both,
        }
    }

    pub fn alerts_on_entry(&self) -> bool {
        matches!(self, GeofenceAction::Entry | GeofenceAction::Both)
    }

    pub fn alerts_on_exit(&self) -> bool {
        matches!(self, GeofenceAction::Exit | GeofenceAction::Both)
    }
}

impl fmt::Display for GeofenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
