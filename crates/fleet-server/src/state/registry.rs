//! Fleet registry: the single in-memory owner of resource state.
//!
//! Every read-modify-write happens while holding the resource's DashMap
//! entry guard, which serves as the per-resource lock. Position is written
//! only through [`FleetRegistry::apply_location`], which the location
//! aggregator alone calls.

use dashmap::DashMap;
use rand::Rng;
use std::collections::BTreeMap;

use fleet_core::{
    initial_bearing_deg, ActiveMission, BatteryModel, BatteryStep, DroneSnapshot, DroneView,
    FleetError, FleetResult, LatLon, LocationUpdate, Resource, ResourceKind, ResourceStatus,
};

/// Defaults stamped on newly registered drones.
#[derive(Debug, Clone)]
pub struct DroneDefaults {
    pub signal_strength: String,
    pub temperature_c: f64,
}

/// Result of applying a queued location update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOutcome {
    Applied,
    /// The resource left the status the update was produced for.
    Stale,
    Unknown,
}

#[derive(Debug, Clone)]
struct FleetEntry {
    resource: Resource,
    drone: Option<DroneView>,
}

impl FleetEntry {
    fn snapshot(&self) -> Option<DroneSnapshot> {
        self.drone.as_ref().map(|drone| DroneSnapshot {
            resource: self.resource.clone(),
            drone: drone.clone(),
        })
    }
}

#[derive(Default)]
pub struct FleetRegistry {
    entries: DashMap<String, FleetEntry>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource; drones get a drone view with a random starting
    /// battery (50-100) and heading.
    pub fn register(&self, resource: Resource, defaults: &DroneDefaults) {
        let drone = (resource.kind == ResourceKind::Drone).then(|| {
            let mut rng = rand::rng();
            DroneView {
                battery: rng.random_range(50..=100) as f64,
                heading_deg: rng.random_range(0..360) as f64,
                altitude_ft: 0.0,
                signal_strength: defaults.signal_strength.clone(),
                temperature_c: defaults.temperature_c,
                home_position: resource.base_position,
                current_mission: None,
                textual_status: BTreeMap::new(),
            }
        });
        self.insert(resource, drone);
    }

    /// Insert a resource with an explicit drone view.
    pub fn insert(&self, resource: Resource, drone: Option<DroneView>) {
        self.entries
            .insert(resource.id.clone(), FleetEntry { resource, drone });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Resource> {
        self.entries.get(id).map(|entry| entry.resource.clone())
    }

    pub fn drone(&self, id: &str) -> Option<DroneSnapshot> {
        self.entries.get(id).and_then(|entry| entry.snapshot())
    }

    pub fn status(&self, id: &str) -> Option<ResourceStatus> {
        self.entries.get(id).map(|entry| entry.resource.status)
    }

    pub fn list_by_kind(&self, kind: ResourceKind) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .entries
            .iter()
            .filter(|entry| entry.resource.kind == kind)
            .map(|entry| entry.resource.clone())
            .collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        resources
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> =
            self.entries.iter().map(|entry| entry.resource.clone()).collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        resources
    }

    pub fn list_drones(&self) -> Vec<DroneSnapshot> {
        let mut drones: Vec<DroneSnapshot> =
            self.entries.iter().filter_map(|entry| entry.snapshot()).collect();
        drones.sort_by(|a, b| a.resource.id.cmp(&b.resource.id));
        drones
    }

    pub fn drone_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.drone.is_some())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Battery level of a drone; `None` for unknown ids and non-drones.
    pub fn battery(&self, id: &str) -> Option<f64> {
        self.entries
            .get(id)
            .and_then(|entry| entry.drone.as_ref().map(|drone| drone.battery))
    }

    /// A drone with an empty battery must not be moved by any task.
    pub fn is_grounded(&self, id: &str) -> bool {
        self.battery(id).is_some_and(|level| level <= 0.0)
    }

    pub fn altitude(&self, id: &str) -> f64 {
        self.entries
            .get(id)
            .and_then(|entry| entry.drone.as_ref().map(|drone| drone.altitude_ft))
            .unwrap_or(0.0)
    }

    /// Home of a drone, or the base of any other resource.
    pub fn home_position(&self, id: &str) -> Option<LatLon> {
        self.entries.get(id).map(|entry| match &entry.drone {
            Some(drone) => drone.home_position,
            None => entry.resource.base_position,
        })
    }

    /// Move a resource and derive its heading from the previous position.
    pub(crate) fn apply_location(&self, update: &LocationUpdate) -> LocationOutcome {
        let Some(mut entry) = self.entries.get_mut(&update.resource_id) else {
            return LocationOutcome::Unknown;
        };
        if let Some(required) = update.required_status {
            if entry.resource.status != required {
                return LocationOutcome::Stale;
            }
        }
        let previous = entry.resource.position;
        entry.resource.position = update.position;
        if let Some(drone) = entry.drone.as_mut() {
            if previous != update.position {
                drone.heading_deg = initial_bearing_deg(previous, update.position);
            }
        }
        LocationOutcome::Applied
    }

    /// Put a resource into Mission, returning the status it left.
    pub fn begin_mission(&self, id: &str, mission: ActiveMission) -> FleetResult<ResourceStatus> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| FleetError::NotFound(id.to_string()))?;

        let previous = entry.resource.status;
        if previous == ResourceStatus::Mission {
            return Err(FleetError::Conflict(id.to_string()));
        }
        entry.resource.status = ResourceStatus::Mission;
        if let Some(drone) = entry.drone.as_mut() {
            drone.current_mission = Some(mission);
        }
        Ok(previous)
    }

    /// Compare-and-set on the status. Returns whether the transition happened.
    pub fn transition(&self, id: &str, from: ResourceStatus, to: ResourceStatus) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) if entry.resource.status == from => {
                entry.resource.status = to;
                true
            }
            _ => false,
        }
    }

    /// Advance one battery tick. Only the battery task calls this.
    pub fn update_battery(&self, id: &str, model: &BatteryModel) -> Option<(BatteryStep, DroneSnapshot)> {
        let mut entry = self.entries.get_mut(id)?;
        let at_base = entry.resource.at_base();
        let drone = entry.drone.as_mut()?;
        let step = model.step(drone.battery, at_base);
        drone.battery = step.level;
        let snapshot = entry.snapshot()?;
        Some((step, snapshot))
    }

    pub fn set_altitude(&self, id: &str, altitude_ft: f64) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if let Some(drone) = entry.drone.as_mut() {
                drone.altitude_ft = altitude_ft;
            }
        }
    }

    pub fn clear_mission(&self, id: &str) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if let Some(drone) = entry.drone.as_mut() {
                drone.current_mission = None;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_battery(&self, id: &str, level: f64) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if let Some(drone) = entry.drone.as_mut() {
                drone.battery = level;
            }
        }
    }
}
