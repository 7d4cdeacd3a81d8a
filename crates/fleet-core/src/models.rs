//! Core data models for the fleet emulator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::equirectangular_distance_km;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Parse a `[lat, lon]` pair as sent in mission commands.
    pub fn from_pair(pair: &[f64]) -> Option<Self> {
        match pair {
            [lat, lon] => Some(Self::new(*lat, *lon)).filter(Self::is_valid),
            _ => None,
        }
    }

    /// Finite and within lat [-90, 90], lon [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Format as `"lat,lon"` for location reports.
    pub fn to_location_string(&self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Drone,
    Vehicle,
    Other,
}

impl ResourceKind {
    /// Classify a resource record by its `type` string and vehicle flag.
    pub fn classify(type_name: &str, is_vehicle: bool) -> Self {
        if type_name.eq_ignore_ascii_case("drone") {
            ResourceKind::Drone
        } else if is_vehicle {
            ResourceKind::Vehicle
        } else {
            ResourceKind::Other
        }
    }
}

/// Operating state of a resource. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    #[default]
    Patrol,
    Mission,
    ReturnToBase,
}

/// Resource record as provided by the resource list loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub is_vehicle: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub base_latitude: f64,
    pub base_longitude: f64,
}

/// A trackable fleet member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    pub is_vehicle: bool,
    pub position: LatLon,
    pub base_position: LatLon,
    pub status: ResourceStatus,
}

impl Resource {
    /// Build a resource from a loader record. Resources without a reported
    /// position start at their base.
    pub fn from_record(record: &ResourceRecord) -> Self {
        let base_position = LatLon::new(record.base_latitude, record.base_longitude);
        let position = match (record.latitude, record.longitude) {
            (Some(lat), Some(lon)) => LatLon::new(lat, lon),
            _ => base_position,
        };
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: ResourceKind::classify(&record.resource_type, record.is_vehicle),
            is_vehicle: record.is_vehicle,
            position,
            base_position,
            status: ResourceStatus::Patrol,
        }
    }

    pub fn at_base(&self) -> bool {
        self.position == self.base_position
    }
}

/// Mission currently assigned to a drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMission {
    pub mission_id: Option<String>,
    pub mission_name: Option<String>,
    pub destination: LatLon,
}

/// Drone-specific telemetry layered on top of a [`Resource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneView {
    pub battery: f64,
    pub heading_deg: f64,
    pub altitude_ft: f64,
    pub signal_strength: String,
    pub temperature_c: f64,
    pub home_position: LatLon,
    pub current_mission: Option<ActiveMission>,
    #[serde(default)]
    pub textual_status: BTreeMap<String, String>,
}

/// Read-only copy of a drone resource together with its drone view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneSnapshot {
    #[serde(flatten)]
    pub resource: Resource,
    pub drone: DroneView,
}

impl DroneSnapshot {
    pub fn at_home(&self) -> bool {
        self.resource.position == self.drone.home_position
    }
}

/// Activation interval of a restricted zone. A missing bound is the
/// "always active" sentinel, not an open-ended interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ActivationWindow {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    /// Build a window from millisecond timestamps where 0 means unset.
    pub fn from_millis(from_ms: i64, until_ms: i64) -> Self {
        let to_time = |ms: i64| {
            if ms == 0 {
                None
            } else {
                DateTime::<Utc>::from_timestamp_millis(ms)
            }
        };
        Self {
            from: to_time(from_ms),
            until: to_time(until_ms),
        }
    }

    pub fn is_always_active(&self) -> bool {
        self.from.is_none() || self.until.is_none()
    }

    /// Whether `[start, end]` overlaps this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match (self.from, self.until) {
            (Some(from), Some(until)) => start < until && end > from,
            _ => true,
        }
    }
}

/// Polygon with a time window during which crossing it requires clearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictedZone {
    pub id: String,
    /// Vertices in order; the ring is implicitly closed.
    pub polygon: Vec<LatLon>,
    pub active: ActivationWindow,
}

/// Clearance window of a route through one restricted zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceZone {
    pub id: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

/// Mission start/stop command as received from the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub resource_id: String,
    #[serde(default)]
    pub mission_id: Option<String>,
    #[serde(default)]
    pub mission_name: Option<String>,
    #[serde(default)]
    pub mission_type: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<Vec<f64>>,
    #[serde(default)]
    pub gen_timestamp_ms: i64,
}

impl MissionCommand {
    /// Parsed destination waypoints; `None` if any pair is malformed.
    pub fn destinations(&self) -> Option<Vec<LatLon>> {
        self.waypoints
            .iter()
            .map(|pair| LatLon::from_pair(pair))
            .collect()
    }
}

/// Position change routed through the location aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub resource_id: String,
    pub position: LatLon,
    /// Apply only if the resource is still in this status.
    pub required_status: Option<ResourceStatus>,
}

impl LocationUpdate {
    pub fn new(resource_id: impl Into<String>, position: LatLon) -> Self {
        Self {
            resource_id: resource_id.into(),
            position,
            required_status: None,
        }
    }

    pub fn while_in(mut self, status: ResourceStatus) -> Self {
        self.required_status = Some(status);
        self
    }
}

/// Location report sent to the downstream platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLocation {
    pub resource_id: String,
    pub location: String,
    pub altitude: f64,
    pub is_external: bool,
    pub is_vehicle: bool,
    pub timestamp_ms: i64,
}

impl ResourceLocation {
    pub fn new(resource_id: &str, position: LatLon, altitude: f64, is_vehicle: bool) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            location: position.to_location_string(),
            altitude,
            is_external: true,
            is_vehicle,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Drone status snapshot sent to the downstream platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneStatus {
    pub resource_id: String,
    /// Miles per hour.
    pub speed: f32,
    pub battery_level: f32,
    pub heading: f32,
    pub altitude: f32,
    /// Kilometers.
    pub distance_from_home: f32,
    pub gps_status: String,
    pub signal_strength: String,
    pub temperature: f32,
    pub timestamp_ms: i64,
    pub gen_timestamp_ms: i64,
    pub textual_status: BTreeMap<String, String>,
}

impl DroneStatus {
    /// Snapshot a drone for publishing. A drone sitting at home reports no
    /// speed, heading or altitude.
    pub fn from_snapshot(snapshot: &DroneSnapshot, cruise_speed_mph: f64) -> Self {
        let drone = &snapshot.drone;
        let at_home = snapshot.at_home();
        let distance_km =
            equirectangular_distance_km(drone.home_position, snapshot.resource.position);
        let now_ms = Utc::now().timestamp_millis();
        let (speed, heading, altitude) = if at_home {
            (0.0, 0.0, 0.0)
        } else {
            (cruise_speed_mph, drone.heading_deg, drone.altitude_ft)
        };

        Self {
            resource_id: snapshot.resource.id.clone(),
            speed: speed as f32,
            battery_level: drone.battery.round() as f32,
            heading: heading as f32,
            altitude: altitude as f32,
            distance_from_home: ((distance_km * 10.0).round() / 10.0) as f32,
            gps_status: rand::rng().random_range(5..7).to_string(),
            signal_strength: drone.signal_strength.clone(),
            temperature: drone.temperature_c as f32,
            timestamp_ms: now_ms,
            gen_timestamp_ms: now_ms,
            textual_status: drone.textual_status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn drone_snapshot(position: LatLon, home: LatLon) -> DroneSnapshot {
        DroneSnapshot {
            resource: Resource {
                id: "D1".to_string(),
                name: "Drone 1".to_string(),
                kind: ResourceKind::Drone,
                is_vehicle: false,
                position,
                base_position: home,
                status: ResourceStatus::Patrol,
            },
            drone: DroneView {
                battery: 72.6,
                heading_deg: 45.0,
                altitude_ft: 400.0,
                signal_strength: "Excellent".to_string(),
                temperature_c: 31.0,
                home_position: home,
                current_mission: None,
                textual_status: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn classify_resource_kind() {
        assert_eq!(ResourceKind::classify("DRONE", false), ResourceKind::Drone);
        assert_eq!(ResourceKind::classify("CAR", true), ResourceKind::Vehicle);
        assert_eq!(ResourceKind::classify("PERSON", false), ResourceKind::Other);
    }

    #[test]
    fn resource_without_position_starts_at_base() {
        let record: ResourceRecord = serde_json::from_value(serde_json::json!({
            "id": "R1",
            "name": "Unit",
            "type": "DRONE",
            "baseLatitude": 1.33,
            "baseLongitude": 103.81
        }))
        .unwrap();
        let resource = Resource::from_record(&record);
        assert_eq!(resource.position, LatLon::new(1.33, 103.81));
        assert!(resource.at_base());
        assert_eq!(resource.status, ResourceStatus::Patrol);
    }

    #[test]
    fn zero_timestamp_is_always_active() {
        let window = ActivationWindow::from_millis(0, 1_700_000_000_000);
        assert!(window.is_always_active());
        let far_past = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(window.overlaps(far_past, far_past));
    }

    #[test]
    fn bounded_window_overlap() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = ActivationWindow::between(from, until);

        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap();

        assert!(window.overlaps(early, mid));
        assert!(window.overlaps(mid, late));
        assert!(!window.overlaps(early, from));
        assert!(!window.overlaps(until, late));
    }

    #[test]
    fn mission_command_rejects_malformed_waypoints() {
        let command: MissionCommand = serde_json::from_value(serde_json::json!({
            "resourceId": "D1",
            "missionId": "M1",
            "waypoints": [[1.3, 103.8], [1.4]],
            "genTimestampMs": 0
        }))
        .unwrap();
        assert!(command.destinations().is_none());
    }

    #[test]
    fn waypoints_must_be_on_the_globe() {
        assert_eq!(LatLon::from_pair(&[1.3, 103.8]), Some(LatLon::new(1.3, 103.8)));
        assert_eq!(LatLon::from_pair(&[-90.0, 180.0]), Some(LatLon::new(-90.0, 180.0)));
        assert!(LatLon::from_pair(&[500.0, 900.0]).is_none());
        assert!(LatLon::from_pair(&[1.3, -180.5]).is_none());
        assert!(LatLon::from_pair(&[f64::NAN, 103.8]).is_none());
        assert!(LatLon::from_pair(&[f64::INFINITY, 103.8]).is_none());
    }

    #[test]
    fn status_at_home_reports_idle() {
        let home = LatLon::new(1.3, 103.8);
        let status = DroneStatus::from_snapshot(&drone_snapshot(home, home), 67.0);
        assert_eq!(status.speed, 0.0);
        assert_eq!(status.altitude, 0.0);
        assert_eq!(status.heading, 0.0);
        assert_eq!(status.battery_level, 73.0);
        assert_eq!(status.distance_from_home, 0.0);
        let gps: u32 = status.gps_status.parse().unwrap();
        assert!((5..7).contains(&gps));
    }

    #[test]
    fn status_in_flight_reports_cruise() {
        let home = LatLon::new(1.3, 103.8);
        let status =
            DroneStatus::from_snapshot(&drone_snapshot(LatLon::new(1.31, 103.8), home), 67.0);
        assert_eq!(status.speed, 67.0);
        assert_eq!(status.altitude, 400.0);
        assert!((status.distance_from_home - 1.1).abs() < 0.05);

        let wire = serde_json::to_value(&status).unwrap();
        assert!(wire.get("batteryLevel").is_some());
        assert!(wire.get("distanceFromHome").is_some());
    }
}
