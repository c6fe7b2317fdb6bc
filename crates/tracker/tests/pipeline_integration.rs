//! Integration tests for the telemetry pipeline.
//!
//! Run with: cargo test --test pipeline_integration

mod common;

use common::{
    command_line, create_test_pipeline, depot_catalog, end_trip_line, telemetry_line,
    unique_vehicle_id, DEPOT_LAT, DEPOT_LON,
};
use domain::models::{AlertSeverity, EngineState};
use domain::services::FailurePolicy;
use tokio::io::BufReader;
use tokio_test::{assert_err, assert_ok};
use tracker::catalog::Catalog;
use tracker::pipeline::{spawn_alert_listener, MessageOutcome};
use tracker::registry::lock_vehicle;

// ============================================================================
// Alerting Tests
// ============================================================================

#[tokio::test]
async fn test_depot_entry_and_speeding_alerts_in_priority_order() {
    let vehicle_id = unique_vehicle_id();
    let pipeline = create_test_pipeline(depot_catalog(&vehicle_id), FailurePolicy::FailFast);

    // outside the depot, under the limit
    let outcome =
        assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, 40.80, -74.10, 50.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { alerts, .. }) => assert!(alerts.is_empty()),
        other => panic!("unexpected {other:?}"),
    }

    // inside the depot, over the limit
    let outcome =
        assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, DEPOT_LAT, DEPOT_LON, 120.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { alerts, .. }) => {
            let keys: Vec<&str> = alerts.iter().map(|a| a.rule_key.as_str()).collect();
            assert_eq!(keys, vec!["DEPOT_ARRIVAL", "SPEED_LIMIT"]);
            assert_eq!(alerts[0].severity, AlertSeverity::Info);
            assert!(alerts[0].message.contains("entered geofence DEPOT"));
            assert_eq!(alerts[1].severity, AlertSeverity::Warning);
        }
        other => panic!("unexpected {other:?}"),
    }

    // still inside: no second entry alert
    let outcome =
        assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, DEPOT_LAT, DEPOT_LON, 20.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { alerts, .. }) => assert!(alerts.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_critical_speed_alert() {
    let vehicle_id = unique_vehicle_id();
    let pipeline = create_test_pipeline(depot_catalog(&vehicle_id), FailurePolicy::FailFast);

    let outcome =
        assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, 40.80, -74.10, 160.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { alerts, .. }) => {
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_vehicle_without_rules_never_alerts() {
    let pipeline = create_test_pipeline(Catalog::default(), FailurePolicy::Isolate);

    let outcome = assert_ok!(pipeline.handle_line(&telemetry_line("VAN_1", 0.0, 0.0, 250.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { alerts, rule_failures, .. }) => {
            assert!(alerts.is_empty());
            assert!(rule_failures.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ============================================================================
// Vehicle Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_trip_lifecycle_and_fuel_commands() {
    let vehicle_id = unique_vehicle_id();
    let pipeline = create_test_pipeline(depot_catalog(&vehicle_id), FailurePolicy::FailFast);

    assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, 40.80, -74.10, 50.0)));
    assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, 40.81, -74.10, 60.0)));

    // refused while driving
    let err = assert_err!(pipeline.handle_line(&command_line("fuelCut", &vehicle_id)));
    assert_eq!(err.code(), "VEHICLE_FUEL_CUT_MOVING");

    // stop, then cut
    let outcome =
        assert_ok!(pipeline.handle_line(&telemetry_line(&vehicle_id, 40.81, -74.10, 0.0)));
    match outcome {
        Some(MessageOutcome::Telemetry { engine_state, .. }) => {
            assert_eq!(engine_state, EngineState::Idle)
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_ok!(pipeline.handle_line(&command_line("fuelCut", &vehicle_id)));
    let err = assert_err!(pipeline.handle_line(&command_line("fuelCut", &vehicle_id)));
    assert_eq!(err.code(), "VEHICLE_FUEL_CUT_ACTIVE");

    let outcome = assert_ok!(pipeline.handle_line(&command_line("fuelRestore", &vehicle_id)));
    match outcome {
        Some(MessageOutcome::FuelRestored { engine_state, .. }) => {
            assert_eq!(engine_state, EngineState::On)
        }
        other => panic!("unexpected {other:?}"),
    }

    let outcome = assert_ok!(pipeline.handle_line(&end_trip_line(&vehicle_id, 40.81, -74.10)));
    match outcome {
        Some(MessageOutcome::TripEnded(trip)) => {
            assert!(trip.total_distance_km() > 0.5);
            assert!(!trip.is_active());
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = assert_err!(pipeline.handle_line(&end_trip_line(&vehicle_id, 40.81, -74.10)));
    assert_eq!(err.code(), "TRIP_NOT_ACTIVE");
}

// ============================================================================
// Stream Tests
// ============================================================================

#[tokio::test]
async fn test_run_counts_processed_and_rejected_lines() {
    let vehicle_id = unique_vehicle_id();
    let pipeline = create_test_pipeline(depot_catalog(&vehicle_id), FailurePolicy::FailFast);
    let listener = spawn_alert_listener(pipeline.registry().clone(), pipeline.subscribe());

    let input = [
        telemetry_line(&vehicle_id, 40.80, -74.10, 50.0),
        String::new(),
        "not json".to_string(),
        telemetry_line(&vehicle_id, DEPOT_LAT, DEPOT_LON, 130.0),
        telemetry_line(&vehicle_id, 95.0, 0.0, 10.0),
        command_line("fuelCut", "UNKNOWN"),
    ]
    .join("\n");

    let summary = assert_ok!(pipeline.run(BufReader::new(input.as_bytes())).await);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.alerts, 2);

    let registry = pipeline.registry().clone();
    drop(pipeline);
    assert_eq!(assert_ok!(listener.await), 2);

    let handle = registry.get(&vehicle_id).expect("vehicle registered");
    let vehicle = lock_vehicle(&handle);
    assert_eq!(vehicle.recent_alerts().len(), 2);
    assert_eq!(vehicle.engine_state(), EngineState::Moving);
    assert_eq!(registry.vehicle_ids(), vec![vehicle_id.clone()]);
}
