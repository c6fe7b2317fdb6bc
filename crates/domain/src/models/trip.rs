//! Trip domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::LocationPoint;

/// Prefix of generated trip identifiers.
pub const TRIP_ID_PREFIX: &str = "TRIP_";

/// A contiguous period of vehicle movement.
///
/// The route is append-only and always starts with the start location.
/// `total_distance_km` is the running sum of haversine distances between
/// consecutive route points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    trip_id: String,
    vehicle_id: String,
    start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<DateTime<Utc>>,
    start_location: LocationPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_location: Option<LocationPoint>,
    route_points: Vec<LocationPoint>,
    total_distance_km: f64,
}

impl Trip {
    /// Starts a trip at `start_location`; the start time is the sample's timestamp.
    pub fn new(vehicle_id: &str, start_location: LocationPoint) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            trip_id: format!("{}{}_{}", TRIP_ID_PREFIX, vehicle_id, &suffix[..8]),
            vehicle_id: vehicle_id.to_string(),
            start_time: start_location.timestamp,
            end_time: None,
            start_location: start_location.clone(),
            end_location: None,
            route_points: vec![start_location],
            total_distance_km: 0.0,
        }
    }

    /// Appends a point to the route and extends the running distance.
    pub fn add_location(&mut self, location: LocationPoint) {
        if let Some(last) = self.route_points.last() {
            self.total_distance_km += last.distance_to(&location);
        }
        self.route_points.push(location);
    }

    /// Closes the trip at `end_location`, using the sample's timestamp as end time.
    pub(crate) fn end(&mut self, end_location: LocationPoint) {
        self.end_time = Some(end_location.timestamp);
        self.end_location = Some(end_location.clone());
        self.add_location(end_location);
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time: start→now while active, start→end once ended.
    pub fn duration(&self) -> Duration {
        self.duration_at(Utc::now())
    }

    /// Same as [`Trip::duration`] with an explicit "now" for active trips.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        match self.end_time {
            Some(end) => end - self.start_time,
            None => now - self.start_time,
        }
    }

    /// Average speed in km/h, or 0 when the trip has no whole second of duration.
    pub fn average_speed(&self) -> f64 {
        self.average_speed_at(Utc::now())
    }

    pub fn average_speed_at(&self, now: DateTime<Utc>) -> f64 {
        let seconds = self.duration_at(now).num_seconds();
        if seconds == 0 {
            return 0.0;
        }
        self.total_distance_km / (seconds as f64 / 3600.0)
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn start_location(&self) -> &LocationPoint {
        &self.start_location
    }

    pub fn end_location(&self) -> Option<&LocationPoint> {
        self.end_location.as_ref()
    }

    /// Read-only view of the route.
    pub fn route_points(&self) -> &[LocationPoint] {
        &self.route_points
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }
}

impl PartialEq for Trip {
    fn eq(&self, other: &Self) -> bool {
        self.trip_id == other.trip_id
    }
}

// ============================================================================
// Tests
// ============================================================================
