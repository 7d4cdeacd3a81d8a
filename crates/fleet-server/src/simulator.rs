//! Fleet simulator: owns the background tasks and the mission entry points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout_at;

use fleet_core::{
    ActiveMission, FleetError, FleetResult, LatLon, LocationUpdate, MissionCommand,
    ResourceLocation, ResourceStatus,
};

use crate::config::SimulationSettings;
use crate::loops::{battery_loop, location_loop, mission_loop, patrol_loop};
use crate::publisher::StatusPublisher;
use crate::state::commands::{CommandChannels, TaskSignal};
use crate::state::registry::FleetRegistry;
use crate::state::tracks::TrackStore;

/// Capacity of the queue feeding the location aggregator.
const LOCATION_QUEUE_CAPACITY: usize = 10;

/// Handles shared by every simulation task.
#[derive(Clone)]
pub struct TaskContext {
    pub registry: Arc<FleetRegistry>,
    pub tracks: Arc<TrackStore>,
    pub commands: Arc<CommandChannels>,
    pub publisher: Arc<dyn StatusPublisher>,
    pub settings: Arc<SimulationSettings>,
    locations: mpsc::Sender<LocationUpdate>,
    shutdown: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
}

impl TaskContext {
    /// Subscribe to shutdown. `None` once shutdown has begun, in which case
    /// the caller must not start work.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<()>> {
        let receiver = self.shutdown.subscribe();
        if self.stopping.load(Ordering::SeqCst) {
            None
        } else {
            Some(receiver)
        }
    }

    /// Queue a position change for the aggregator and report it downstream.
    /// Returns false if the aggregator is gone.
    pub async fn emit_location(&self, resource_id: &str, position: LatLon, altitude_ft: f64) -> bool {
        self.send_location(LocationUpdate::new(resource_id, position), altitude_ft)
            .await
    }

    /// Like [`Self::emit_location`], but the aggregator drops the point if
    /// the resource has left Patrol by the time it is applied.
    pub async fn emit_patrol_location(&self, resource_id: &str, position: LatLon, altitude_ft: f64) -> bool {
        let update = LocationUpdate::new(resource_id, position).while_in(ResourceStatus::Patrol);
        self.send_location(update, altitude_ft).await
    }

    async fn send_location(&self, update: LocationUpdate, altitude_ft: f64) -> bool {
        let resource_id = update.resource_id.clone();
        let position = update.position;
        let required = update.required_status;
        if self.locations.send(update).await.is_err() {
            tracing::warn!("Location queue closed, dropping update for {}", resource_id);
            return false;
        }
        let Some(resource) = self.registry.get(&resource_id) else {
            return true;
        };
        if required.is_some_and(|status| status != resource.status) {
            return true;
        }
        self.publisher.publish_location(ResourceLocation::new(
            &resource_id,
            position,
            altitude_ft,
            resource.is_vehicle,
        ));
        true
    }
}

pub struct FleetSimulator {
    registry: Arc<FleetRegistry>,
    commands: Arc<CommandChannels>,
    settings: Arc<SimulationSettings>,
    context: Mutex<Option<TaskContext>>,
    shutdown: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FleetSimulator {
    /// Spawn the aggregator, the battery task and a patrol task for every
    /// resource with a track.
    pub async fn start(
        registry: Arc<FleetRegistry>,
        tracks: Arc<TrackStore>,
        publisher: Arc<dyn StatusPublisher>,
        settings: SimulationSettings,
    ) -> Arc<Self> {
        let (locations, location_rx) = mpsc::channel(LOCATION_QUEUE_CAPACITY);
        let (shutdown, _) = broadcast::channel(1);
        let stopping = Arc::new(AtomicBool::new(false));
        let commands = Arc::new(CommandChannels::new());
        let settings = Arc::new(settings);

        let context = TaskContext {
            registry: registry.clone(),
            tracks: tracks.clone(),
            commands: commands.clone(),
            publisher,
            settings: settings.clone(),
            locations,
            shutdown: shutdown.clone(),
            stopping: stopping.clone(),
        };

        let aggregator = tokio::spawn(location_loop::run_location_loop(
            registry.clone(),
            location_rx,
        ));
        let battery = tokio::spawn(battery_loop::run_battery_loop(
            context.clone(),
            shutdown.subscribe(),
        ));

        let mut patrols = 0;
        for resource_id in tracks.patrolling_ids().await {
            if !registry.contains(&resource_id) {
                continue;
            }
            tokio::spawn(patrol_loop::run_patrol_loop(
                context.clone(),
                resource_id,
                shutdown.subscribe(),
            ));
            patrols += 1;
        }
        tracing::info!(
            "Fleet simulation started: {} resources, {} patrols",
            registry.len(),
            patrols
        );

        Arc::new(Self {
            registry,
            commands,
            settings,
            context: Mutex::new(Some(context)),
            shutdown,
            stopping,
            workers: Mutex::new(vec![battery, aggregator]),
        })
    }

    fn context(&self) -> FleetResult<TaskContext> {
        self.context
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| FleetError::Internal("simulator is shutting down".to_string()))
    }

    /// Send a resource to the first waypoint of `command`.
    pub fn start_mission(&self, command: &MissionCommand) -> FleetResult<()> {
        let context = self.context()?;
        let resource_id = command.resource_id.trim();
        if resource_id.is_empty() {
            return Err(FleetError::Validation("resourceId is required".to_string()));
        }
        let destination = command
            .destinations()
            .and_then(|points| points.first().copied())
            .ok_or_else(|| {
                FleetError::Validation("waypoints must hold at least one [lat, lon] pair".to_string())
            })?;

        let mission = ActiveMission {
            mission_id: command.mission_id.clone(),
            mission_name: command.mission_name.clone(),
            destination,
        };
        let previous = self.registry.begin_mission(resource_id, mission)?;

        tracing::info!(
            "Mission {} started for {} ({:?} -> MISSION), destination {},{}",
            command.mission_id.as_deref().unwrap_or("-"),
            resource_id,
            previous,
            destination.lat,
            destination.lon
        );
        tokio::spawn(mission_loop::run_mission(
            context,
            resource_id.to_string(),
            destination,
            previous == ResourceStatus::ReturnToBase,
        ));
        Ok(())
    }

    /// Ask the running mission or return-to-base task to stop. A resource on
    /// patrol has nothing to stop.
    pub fn stop_mission(&self, command: &MissionCommand) -> FleetResult<()> {
        let resource_id = command.resource_id.trim();
        if resource_id.is_empty() {
            return Err(FleetError::Validation("resourceId is required".to_string()));
        }
        let status = self
            .registry
            .status(resource_id)
            .ok_or_else(|| FleetError::NotFound(resource_id.to_string()))?;

        if status == ResourceStatus::Patrol {
            tracing::debug!("Stop for {} ignored, resource is on patrol", resource_id);
            return Ok(());
        }

        let channel = self.commands.channel(resource_id);
        let wait = self.settings.command_wait;
        let resource_id = resource_id.to_string();
        tokio::spawn(async move {
            if channel.deliver(TaskSignal::Stop, wait).await {
                tracing::info!("Stop delivered to {}", resource_id);
            } else {
                tracing::warn!("No running task took the stop for {}", resource_id);
            }
        });
        Ok(())
    }

    /// Stop every task, then wait for the aggregator and the battery task to
    /// finish.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down fleet simulation");
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(());

        // drop our queue sender so the aggregator ends once the tasks have
        if let Ok(mut context) = self.context.lock() {
            context.take();
        }

        let workers: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let deadline = tokio::time::Instant::now() + self.settings.shutdown_timeout;
        for worker in workers {
            match timeout_at(deadline, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Simulation task failed: {}", e),
                Err(_) => {
                    tracing::warn!("Simulation tasks did not finish within {:?}", self.settings.shutdown_timeout);
                    break;
                }
            }
        }
        tracing::info!("Fleet simulation stopped");
    }
}
