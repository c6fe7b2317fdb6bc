//! Vehicle aggregate and its engine-state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::location::LocationPoint;
use super::trip::Trip;
use crate::error::DomainError;

/// Maximum number of alert messages kept per vehicle.
pub const MAX_RECENT_ALERTS: usize = 100;

/// Speed above which a fuel cut is refused, in km/h.
pub const FUEL_CUT_MAX_SPEED_KMH: f64 = 10.0;

// ============================================================================
// Engine State Enum
// ============================================================================

/// Operational state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    #[default]
    Off,
    On,
    Moving,
    Idle,
    FuelCutActive,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Off => "OFF",
            EngineState::On => "ON",
            EngineState::Moving => "MOVING",
            EngineState::Idle => "IDLE",
            EngineState::FuelCutActive => "FUEL_CUT_ACTIVE",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Fuel Status
// ============================================================================

/// Last known fuel reading of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelStatus {
    pub current_level: f64,
    pub last_consumption: f64,
    pub last_updated: DateTime<Utc>,
}

impl FuelStatus {
    /// Low fuel threshold, in percent.
    pub const LOW_LEVEL: f64 = 15.0;
    /// Empty tank threshold, in percent.
    pub const EMPTY_LEVEL: f64 = 5.0;

    pub fn full() -> Self {
        Self {
            current_level: 100.0,
            last_consumption: 0.0,
            last_updated: Utc::now(),
        }
    }

    pub fn is_low(&self) -> bool {
        self.current_level < Self::LOW_LEVEL
    }

    pub fn is_empty(&self) -> bool {
        self.current_level < Self::EMPTY_LEVEL
    }
}

// ============================================================================
// Vehicle Aggregate
// ============================================================================

/// A tracked vehicle.
///
/// Mutated only through [`Vehicle::process_new_telemetry`], [`Vehicle::end_trip`],
/// [`Vehicle::issue_fuel_cut_off_command`] and
/// [`Vehicle::issue_fuel_restore_command`]. At most one trip is active at a time;
/// an idle vehicle keeps the trip it started while moving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    vehicle_id: String,
    device_id: Option<String>,
    current_location: Option<LocationPoint>,
    engine_state: EngineState,
    fuel_status: FuelStatus,
    fuel_cut_active: bool,
    last_movement_time: Option<DateTime<Utc>>,
    active_trip: Option<Trip>,
    recent_alerts: VecDeque<String>,
}

impl Vehicle {
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            device_id: None,
            current_location: None,
            engine_state: EngineState::Off,
            fuel_status: FuelStatus::full(),
            fuel_cut_active: false,
            last_movement_time: None,
            active_trip: None,
            recent_alerts: VecDeque::with_capacity(MAX_RECENT_ALERTS),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Applies a telemetry sample to the state machine.
    ///
    /// Moving samples start a trip when none is active; a stationary sample after
    /// movement switches to IDLE without ending the trip.
    pub fn process_new_telemetry(&mut self, location: LocationPoint) -> Result<(), DomainError> {
        if !location.is_valid() {
            return Err(DomainError::InvalidLocation);
        }

        self.current_location = Some(location.clone());

        if location.speed_kmh > 0.0 {
            self.engine_state = EngineState::Moving;
            self.last_movement_time = Some(Utc::now());

            if self.active_trip.is_none() {
                self.start_trip(location.clone())?;
            }
        } else if self.engine_state == EngineState::Moving {
            self.engine_state = EngineState::Idle;
            self.last_movement_time = Some(Utc::now());
        }

        if self.engine_state == EngineState::Moving {
            if let Some(trip) = self.active_trip.as_mut() {
                trip.add_location(location);
            }
        }

        Ok(())
    }

    fn start_trip(&mut self, start_location: LocationPoint) -> Result<(), DomainError> {
        if self.active_trip.is_some() {
            return Err(DomainError::TripAlreadyActive {
                vehicle_id: self.vehicle_id.clone(),
            });
        }

        let trip = Trip::new(&self.vehicle_id, start_location);
        tracing::info!(
            vehicle_id = %self.vehicle_id,
            trip_id = %trip.trip_id(),
            "Trip started"
        );
        self.active_trip = Some(trip);
        Ok(())
    }

    /// Ends the active trip at `end_location` and returns it.
    pub fn end_trip(&mut self, end_location: LocationPoint) -> Result<Trip, DomainError> {
        let mut trip = self
            .active_trip
            .take()
            .ok_or_else(|| DomainError::TripNotActive {
                vehicle_id: self.vehicle_id.clone(),
            })?;

        trip.end(end_location);
        tracing::info!(
            vehicle_id = %self.vehicle_id,
            trip_id = %trip.trip_id(),
            distance_km = trip.total_distance_km(),
            "Trip ended"
        );
        Ok(trip)
    }

    /// Cuts the fuel supply. Refused above 10 km/h or when already cut.
    pub fn issue_fuel_cut_off_command(&mut self) -> Result<(), DomainError> {
        let speed = self.current_speed_kmh();
        if speed > FUEL_CUT_MAX_SPEED_KMH {
            return Err(DomainError::FuelCutWhileMoving {
                speed_kmh: speed,
                max_kmh: FUEL_CUT_MAX_SPEED_KMH,
            });
        }

        if self.fuel_cut_active {
            return Err(DomainError::FuelCutAlreadyActive {
                vehicle_id: self.vehicle_id.clone(),
            });
        }

        self.fuel_cut_active = true;
        self.engine_state = EngineState::FuelCutActive;

        tracing::info!(vehicle_id = %self.vehicle_id, "Fuel cut requested");
        Ok(())
    }

    /// Restores the fuel supply; the vehicle is MOVING if its last sample moved, ON otherwise.
    pub fn issue_fuel_restore_command(&mut self) {
        self.fuel_cut_active = false;
        self.engine_state = if self.current_speed_kmh() > 0.0 {
            EngineState::Moving
        } else {
            EngineState::On
        };

        tracing::info!(
            vehicle_id = %self.vehicle_id,
            engine_state = %self.engine_state,
            "Fuel restore requested"
        );
    }

    /// Time spent idle, zero unless the vehicle is IDLE.
    pub fn idle_duration(&self) -> Duration {
        self.idle_duration_at(Utc::now())
    }

    pub fn idle_duration_at(&self, now: DateTime<Utc>) -> Duration {
        match (self.engine_state, self.last_movement_time) {
            (EngineState::Idle, Some(last)) => now - last,
            _ => Duration::zero(),
        }
    }

    /// Records an alert message, evicting the oldest beyond [`MAX_RECENT_ALERTS`].
    pub fn add_alert(&mut self, message: &str) {
        self.recent_alerts
            .push_back(format!("{}: {}", Utc::now().to_rfc3339(), message));
        while self.recent_alerts.len() > MAX_RECENT_ALERTS {
            self.recent_alerts.pop_front();
        }
    }

    pub fn update_fuel_status(&mut self, fuel_status: FuelStatus) {
        self.fuel_status = fuel_status;
    }

    fn current_speed_kmh(&self) -> f64 {
        self.current_location
            .as_ref()
            .map(|l| l.speed_kmh)
            .unwrap_or(0.0)
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn current_location(&self) -> Option<&LocationPoint> {
        self.current_location.as_ref()
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    pub fn fuel_status(&self) -> &FuelStatus {
        &self.fuel_status
    }

    pub fn is_fuel_cut_active(&self) -> bool {
        self.fuel_cut_active
    }

    pub fn last_movement_time(&self) -> Option<DateTime<Utc>> {
        self.last_movement_time
    }

    pub fn active_trip(&self) -> Option<&Trip> {
        self.active_trip.as_ref()
    }

    /// Recent alerts, oldest first.
    pub fn recent_alerts(&self) -> Vec<String> {
        self.recent_alerts.iter().cloned().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
