//! End-to-end simulation scenarios on a paused clock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleet_core::{
    DroneStatus, DroneView, FleetError, LatLon, MissionCommand, Resource, ResourceKind,
    ResourceLocation, ResourceStatus,
};
use fleet_server::config::SimulationSettings;
use fleet_server::publisher::StatusPublisher;
use fleet_server::simulator::FleetSimulator;
use fleet_server::state::registry::FleetRegistry;
use fleet_server::state::tracks::TrackStore;

const HOME: LatLon = LatLon::new(1.30, 103.80);

#[derive(Default)]
struct RecordingPublisher {
    locations: Mutex<Vec<ResourceLocation>>,
    statuses: Mutex<Vec<DroneStatus>>,
}

impl RecordingPublisher {
    fn locations(&self) -> Vec<ResourceLocation> {
        self.locations.lock().unwrap().clone()
    }

    fn status_count(&self) -> usize {
        self.statuses.lock().unwrap().len()
    }
}

impl StatusPublisher for RecordingPublisher {
    fn publish_location(&self, location: ResourceLocation) {
        self.locations.lock().unwrap().push(location);
    }

    fn publish_status(&self, status: DroneStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}

fn drone(id: &str, position: LatLon, battery: f64) -> (Resource, DroneView) {
    let resource = Resource {
        id: id.to_string(),
        name: id.to_string(),
        kind: ResourceKind::Drone,
        is_vehicle: false,
        position,
        base_position: HOME,
        status: ResourceStatus::Patrol,
    };
    let view = DroneView {
        battery,
        heading_deg: 0.0,
        altitude_ft: 0.0,
        signal_strength: "Excellent".to_string(),
        temperature_c: 31.0,
        home_position: HOME,
        current_mission: None,
        textual_status: BTreeMap::new(),
    };
    (resource, view)
}

fn command(resource_id: &str, destination: LatLon) -> MissionCommand {
    MissionCommand {
        operation_id: None,
        resource_id: resource_id.to_string(),
        mission_id: Some("M-1".to_string()),
        mission_name: Some("Survey".to_string()),
        mission_type: None,
        waypoints: vec![vec![destination.lat, destination.lon]],
        gen_timestamp_ms: 0,
    }
}

struct Harness {
    registry: Arc<FleetRegistry>,
    publisher: Arc<RecordingPublisher>,
    simulator: Arc<FleetSimulator>,
}

async fn harness(drones: Vec<(Resource, DroneView)>, tracks: TrackStore) -> Harness {
    let registry = Arc::new(FleetRegistry::new());
    for (resource, view) in drones {
        registry.insert(resource, Some(view));
    }
    let publisher = Arc::new(RecordingPublisher::default());
    let simulator = FleetSimulator::start(
        registry.clone(),
        Arc::new(tracks),
        publisher.clone(),
        SimulationSettings::default(),
    )
    .await;
    Harness {
        registry,
        publisher,
        simulator,
    }
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn mission_then_return_to_base_then_patrol() {
    let h = harness(vec![drone("D1", HOME, 100.0)], TrackStore::new()).await;
    let destination = LatLon::new(1.312, 103.812);

    h.simulator.start_mission(&command("D1", destination)).unwrap();
    assert_eq!(h.registry.status("D1"), Some(ResourceStatus::Mission));

    advance(61).await;
    let snapshot = h.registry.drone("D1").unwrap();
    assert_eq!(snapshot.resource.status, ResourceStatus::ReturnToBase);
    assert_eq!(snapshot.resource.position, destination);
    assert!(snapshot.drone.current_mission.is_none());
    assert!((snapshot.drone.heading_deg - 45.0).abs() < 1.0);

    let locations = h.publisher.locations();
    assert_eq!(locations.len(), 12);
    assert!(locations.iter().all(|l| l.altitude == 400.0 && l.is_external));
    assert_eq!(locations[11].location, "1.312,103.812");

    advance(61).await;
    let snapshot = h.registry.drone("D1").unwrap();
    assert_eq!(snapshot.resource.status, ResourceStatus::Patrol);
    assert_eq!(snapshot.resource.position, HOME);
    assert_eq!(snapshot.drone.altitude_ft, 0.0);
    assert_eq!(h.publisher.locations().len(), 24);
    // one status per drone per battery tick
    assert!(h.publisher.status_count() >= 24);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_mission_returns_home() {
    let h = harness(vec![drone("D1", HOME, 100.0)], TrackStore::new()).await;
    let destination = LatLon::new(1.36, 103.86);

    h.simulator.start_mission(&command("D1", destination)).unwrap();
    advance(11).await;
    assert_eq!(h.publisher.locations().len(), 2);

    h.simulator.stop_mission(&command("D1", destination)).unwrap();
    advance(5).await;
    assert_eq!(h.registry.status("D1"), Some(ResourceStatus::ReturnToBase));
    assert_eq!(h.publisher.locations().len(), 2);

    advance(70).await;
    assert_eq!(h.registry.status("D1"), Some(ResourceStatus::Patrol));
    assert_eq!(h.registry.get("D1").unwrap().position, HOME);

    // stopping a patrolling resource changes nothing
    h.simulator.stop_mission(&command("D1", destination)).unwrap();
    advance(11).await;
    assert_eq!(h.registry.status("D1"), Some(ResourceStatus::Patrol));
}

#[tokio::test(start_paused = true)]
async fn new_mission_aborts_return_to_base() {
    let h = harness(vec![drone("D1", HOME, 100.0)], TrackStore::new()).await;
    let first = LatLon::new(1.312, 103.812);
    let second = LatLon::new(1.324, 103.800);

    h.simulator.start_mission(&command("D1", first)).unwrap();
    advance(62).await;
    assert_eq!(h.registry.status("D1"), Some(ResourceStatus::ReturnToBase));

    h.simulator.start_mission(&command("D1", second)).unwrap();
    assert_eq!(
        h.simulator.start_mission(&command("D1", first)),
        Err(FleetError::Conflict("D1".to_string()))
    );

    advance(4).await;
    let snapshot = h.registry.drone("D1").unwrap();
    assert_eq!(snapshot.resource.status, ResourceStatus::Mission);
    assert_eq!(snapshot.resource.position, first);
    assert_eq!(snapshot.drone.current_mission.unwrap().destination, second);

    advance(60).await;
    let snapshot = h.registry.drone("D1").unwrap();
    assert_eq!(snapshot.resource.status, ResourceStatus::ReturnToBase);
    assert_eq!(snapshot.resource.position, second);
}

#[tokio::test(start_paused = true)]
async fn depleted_drone_is_sent_home_and_recharges() {
    let away = LatLon::new(1.31, 103.81);
    let h = harness(vec![drone("D1", away, 0.5)], TrackStore::new()).await;

    h.simulator
        .start_mission(&command("D1", LatLon::new(1.40, 103.90)))
        .unwrap();

    advance(120).await;
    let snapshot = h.registry.drone("D1").unwrap();
    assert_eq!(snapshot.resource.status, ResourceStatus::Patrol);
    assert_eq!(snapshot.resource.position, HOME);
    assert_eq!(snapshot.drone.battery, 100.0);
    assert_eq!(snapshot.drone.altitude_ft, 0.0);
    assert!(snapshot.drone.current_mission.is_none());

    let teleport = HOME.to_location_string();
    assert!(h
        .publisher
        .locations()
        .iter()
        .any(|l| l.location == teleport && l.altitude == 0.0));
}

#[tokio::test(start_paused = true)]
async fn patrol_replays_track_only_while_on_patrol() {
    let track = vec![
        LatLon::new(1.301, 103.801),
        LatLon::new(1.302, 103.802),
        LatLon::new(1.303, 103.803),
    ];
    let tracks = TrackStore::new();
    tracks.insert("D1", track.clone()).await;

    let h = harness(vec![drone("D1", HOME, 100.0)], tracks).await;

    advance(45).await;
    assert_eq!(h.publisher.locations().len(), 3);
    assert_eq!(h.registry.get("D1").unwrap().position, track[2]);

    advance(20).await;
    assert_eq!(h.registry.get("D1").unwrap().position, track[0]);

    h.simulator
        .start_mission(&command("D1", LatLon::new(1.35, 103.85)))
        .unwrap();
    let before = h.publisher.locations().len();
    advance(21).await;
    // four mission steps, no patrol points
    assert_eq!(h.publisher.locations().len(), before + 4);
    assert!(h.publisher.locations()[before..]
        .iter()
        .all(|l| l.altitude == 400.0));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_tasks_and_rejects_new_missions() {
    let h = harness(vec![drone("D1", HOME, 100.0)], TrackStore::new()).await;
    h.simulator
        .start_mission(&command("D1", LatLon::new(1.35, 103.85)))
        .unwrap();
    advance(6).await;

    h.simulator.shutdown().await;

    let (resource, view) = drone("D2", HOME, 100.0);
    h.registry.insert(resource, Some(view));
    assert!(matches!(
        h.simulator.start_mission(&command("D2", LatLon::new(1.35, 103.85))),
        Err(FleetError::Internal(_))
    ));

    let emitted = h.publisher.locations().len();
    advance(30).await;
    assert_eq!(h.publisher.locations().len(), emitted);
}
