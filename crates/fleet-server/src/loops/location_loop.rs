//! Location aggregator: the only writer of resource positions.

use std::sync::Arc;

use tokio::sync::mpsc;

use fleet_core::LocationUpdate;

use crate::state::registry::{FleetRegistry, LocationOutcome};

/// Apply queued location updates in arrival order. Ends once every sender
/// has been dropped and the queue is drained.
pub async fn run_location_loop(
    registry: Arc<FleetRegistry>,
    mut updates: mpsc::Receiver<LocationUpdate>,
) {
    let mut applied: u64 = 0;
    while let Some(update) = updates.recv().await {
        match registry.apply_location(&update) {
            LocationOutcome::Applied => {
                applied += 1;
                tracing::trace!(
                    "{} moved to {},{}",
                    update.resource_id,
                    update.position.lat,
                    update.position.lon
                );
            }
            LocationOutcome::Stale => {
                tracing::debug!(
                    "Dropping stale update for {}, no longer {:?}",
                    update.resource_id,
                    update.required_status
                );
            }
            LocationOutcome::Unknown => {
                tracing::warn!("Location update for unknown resource {}", update.resource_id);
            }
        }
    }
    tracing::info!("Location loop shutting down after {} updates", applied);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::registry::DroneDefaults;
    use fleet_core::{ActiveMission, LatLon, Resource, ResourceKind, ResourceStatus};

    #[tokio::test]
    async fn applies_updates_in_order_and_drains_before_exit() {
        let registry = Arc::new(FleetRegistry::new());
        let base = LatLon::new(1.30, 103.80);
        registry.register(
            Resource {
                id: "D1".to_string(),
                name: "D1".to_string(),
                kind: ResourceKind::Drone,
                is_vehicle: false,
                position: base,
                base_position: base,
                status: ResourceStatus::Patrol,
            },
            &DroneDefaults {
                signal_strength: "Excellent".to_string(),
                temperature_c: 31.0,
            },
        );

        let (tx, rx) = mpsc::channel(10);
        for i in 1..=5 {
            tx.send(LocationUpdate::new("D1", LatLon::new(1.30 + i as f64 * 0.01, 103.80)))
                .await
                .unwrap();
        }
        drop(tx);

        run_location_loop(registry.clone(), rx).await;
        let drone = registry.drone("D1").unwrap();
        assert!((drone.resource.position.lat - 1.35).abs() < 1e-12);
        assert_eq!(drone.drone.heading_deg, 0.0);
    }

    #[tokio::test]
    async fn queued_patrol_point_does_not_land_after_mission_start() {
        let registry = Arc::new(FleetRegistry::new());
        let base = LatLon::new(1.30, 103.80);
        registry.register(
            Resource {
                id: "D1".to_string(),
                name: "D1".to_string(),
                kind: ResourceKind::Drone,
                is_vehicle: false,
                position: base,
                base_position: base,
                status: ResourceStatus::Patrol,
            },
            &DroneDefaults {
                signal_strength: "Excellent".to_string(),
                temperature_c: 31.0,
            },
        );

        let (tx, rx) = mpsc::channel(10);
        tx.send(LocationUpdate::new("D1", LatLon::new(1.31, 103.81)).while_in(ResourceStatus::Patrol))
            .await
            .unwrap();
        registry
            .begin_mission(
                "D1",
                ActiveMission {
                    mission_id: None,
                    mission_name: None,
                    destination: LatLon::new(1.35, 103.85),
                },
            )
            .unwrap();
        drop(tx);

        run_location_loop(registry.clone(), rx).await;
        assert_eq!(registry.get("D1").unwrap().position, base);
    }
}
