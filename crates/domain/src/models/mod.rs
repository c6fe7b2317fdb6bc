//! Domain models for the fleet tracker.

pub mod alert;
pub mod alert_rule;
pub mod geofence;
pub mod location;
pub mod trip;
pub mod vehicle;

pub use alert::{AlertEvent, AlertSeverity};
pub use alert_rule::{AlertRuleDefinition, AlertRuleType};
pub use geofence::{Geofence, GeofenceAction, GeofenceShape};
pub use location::LocationPoint;
pub use trip::Trip;
pub use vehicle::{EngineState, FuelStatus, Vehicle};
