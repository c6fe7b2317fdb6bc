//! In-memory vehicle registry.

use chrono::Duration;
use domain::models::{AlertEvent, Vehicle};
use domain::rules::IdleDurationSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Shared handle to one vehicle aggregate.
pub type VehicleHandle = Arc<Mutex<Vehicle>>;

/// Vehicles known to the tracker, registered on first contact.
///
/// Each vehicle sits behind its own mutex, which is the per-vehicle
/// serialization point for state-machine updates. Never hold a vehicle lock
/// while evaluating rules: the idle-time rule reads the vehicle back through
/// [`IdleDurationSource`].
#[derive(Debug, Default)]
pub struct VehicleRegistry {
    vehicles: RwLock<HashMap<String, VehicleHandle>>,
}

/// Locks a vehicle, recovering the aggregate if a previous holder panicked.
pub fn lock_vehicle(handle: &VehicleHandle) -> MutexGuard<'_, Vehicle> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vehicle_id: &str) -> Option<VehicleHandle> {
        self.vehicles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(vehicle_id)
            .cloned()
    }

    /// Returns the vehicle, registering it first if unknown.
    pub fn get_or_register(&self, vehicle_id: &str, device_id: Option<&str>) -> VehicleHandle {
        if let Some(handle) = self.get(vehicle_id) {
            return handle;
        }

        let mut vehicles = self
            .vehicles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(vehicles.entry(vehicle_id.to_string()).or_insert_with(|| {
            let vehicle = match device_id {
                Some(device_id) => Vehicle::new(vehicle_id).with_device(device_id),
                None => Vehicle::new(vehicle_id),
            };
            tracing::info!(vehicle_id = %vehicle_id, "Vehicle registered");
            Arc::new(Mutex::new(vehicle))
        }))
    }

    /// Appends an alert to its vehicle's recent-alert ring. Unknown vehicles are ignored.
    pub fn record_alert(&self, event: &AlertEvent) -> bool {
        match self.get(&event.vehicle_id) {
            Some(handle) => {
                lock_vehicle(&handle).add_alert(&event.message);
                true
            }
            None => {
                tracing::debug!(vehicle_id = %event.vehicle_id, "Alert for unknown vehicle");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vehicles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered vehicle ids, sorted.
    pub fn vehicle_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .vehicles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl IdleDurationSource for VehicleRegistry {
    fn idle_duration(&self, vehicle_id: &str) -> Option<Duration> {
        self.get(vehicle_id)
            .map(|handle| lock_vehicle(&handle).idle_duration())
    }
}
