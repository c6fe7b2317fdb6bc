//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use domain::services::{BroadcastEventPublisher, FailurePolicy};
use fake::Fake;
use serde_json::json;
use std::sync::Arc;
use tracker::catalog::Catalog;
use tracker::pipeline::TelemetryPipeline;
use tracker::registry::VehicleRegistry;

pub const DEPOT_LAT: f64 = 40.7128;
pub const DEPOT_LON: f64 = -74.006;

/// Catalog with a speed limit, an idle limit and a depot entry fence for `vehicle_id`.
pub fn depot_catalog(vehicle_id: &str) -> Catalog {
    let document = json!({
        "geofences": [{
            "geofenceId": "DEPOT",
            "name": "Depot",
            "shapeType": "CIRCLE",
            "centerLatitude": DEPOT_LAT,
            "centerLongitude": DEPOT_LON,
            "radiusMeters": 500.0,
            "vehicleIds": [vehicle_id]
        }],
        "rules": [
            {
                "ruleKey": "SPEED_LIMIT",
                "ruleName": "Speed limit",
                "ruleType": "SPEED",
                "vehicleIds": [vehicle_id],
                "parameters": {"speedLimit": 90}
            },
            {
                "ruleKey": "LONG_IDLE",
                "ruleName": "Long idle",
                "ruleType": "TIME",
                "vehicleIds": [vehicle_id],
                "parameters": {"maxIdleMinutes": 20}
            },
            {
                "ruleKey": "DEPOT_ARRIVAL",
                "ruleName": "Depot arrival",
                "ruleType": "GEOFENCE",
                "priority": 7,
                "vehicleIds": [vehicle_id],
                "parameters": {"geofenceId": "DEPOT", "action": "ENTRY"}
            }
        ]
    });
    Catalog::from_json(&document.to_string()).expect("valid catalog")
}

pub fn create_test_pipeline(catalog: Catalog, policy: FailurePolicy) -> TelemetryPipeline {
    TelemetryPipeline::new(
        catalog,
        Arc::new(VehicleRegistry::new()),
        Arc::new(BroadcastEventPublisher::new(64)),
        policy,
    )
}

pub fn unique_vehicle_id() -> String {
    format!("TRUCK_{}", (10_000..99_999u32).fake::<u32>())
}

pub fn telemetry_line(vehicle_id: &str, lat: f64, lon: f64, speed: f64) -> String {
    json!({
        "type": "telemetry",
        "vehicleId": vehicle_id,
        "latitude": lat,
        "longitude": lon,
        "speedKmh": speed,
        "timestamp": "2026-03-01T08:00:00Z"
    })
    .to_string()
}

pub fn end_trip_line(vehicle_id: &str, lat: f64, lon: f64) -> String {
    json!({
        "type": "endTrip",
        "vehicleId": vehicle_id,
        "latitude": lat,
        "longitude": lon,
        "speedKmh": 0.0,
        "timestamp": "2026-03-01T09:00:00Z"
    })
    .to_string()
}

pub fn command_line(kind: &str, vehicle_id: &str) -> String {
    json!({"type": kind, "vehicleId": vehicle_id}).to_string()
}
