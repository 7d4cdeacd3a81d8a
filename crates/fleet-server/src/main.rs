//! Fleet emulator server.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_core::Resource;
use fleet_server::api;
use fleet_server::config::Config;
use fleet_server::publisher::{HttpPublisher, LogPublisher, StatusPublisher};
use fleet_server::simulator::FleetSimulator;
use fleet_server::sources::{
    DirTrackSource, FileResourceSource, HttpZoneSource, ResourceSource, StaticZoneSource,
    ZoneSource,
};
use fleet_server::state::registry::{DroneDefaults, FleetRegistry};
use fleet_server::state::tracks::TrackStore;
use fleet_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_json)?;

    tracing::info!("Starting fleet emulator...");

    let registry = Arc::new(load_fleet(&config).await?);
    let tracks = Arc::new(TrackStore::new());
    match &config.tracks_dir {
        Some(dir) => {
            let ids = registry.list_resources().into_iter().map(|r| r.id).collect();
            tracks.load_all(Arc::new(DirTrackSource::new(dir)), ids).await;
        }
        None => tracing::warn!("TRACKS_DIR not set, no resource will patrol"),
    }

    let publisher: Arc<dyn StatusPublisher> = match &config.connector_url {
        Some(url) => {
            tracing::info!("Publishing telemetry to {}", url);
            Arc::new(HttpPublisher::new(url.as_str())?)
        }
        None => Arc::new(LogPublisher),
    };
    let zones: Arc<dyn ZoneSource> = match &config.no_fly_zones_url {
        Some(url) => Arc::new(HttpZoneSource::new(url.as_str())?),
        None => {
            tracing::warn!("NO_FLY_ZONES_URL not set, routes are checked against no zones");
            Arc::new(StaticZoneSource::default())
        }
    };

    let simulator = FleetSimulator::start(
        registry.clone(),
        tracks,
        publisher,
        config.simulation_settings(),
    )
    .await;

    let port = config.server_port;
    let state = Arc::new(AppState::new(registry, simulator.clone(), zones, config));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    simulator.shutdown().await;
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fleet_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

async fn load_fleet(config: &Config) -> Result<FleetRegistry> {
    let registry = FleetRegistry::new();
    let Some(path) = &config.resources_file else {
        tracing::warn!("RESOURCES_FILE not set, starting with an empty fleet");
        return Ok(registry);
    };

    let records = FileResourceSource::new(path).load_resources().await?;
    let defaults = DroneDefaults {
        signal_strength: config.drone_signal_strength.clone(),
        temperature_c: config.drone_temperature_c,
    };
    for record in &records {
        registry.register(Resource::from_record(record), &defaults);
    }
    tracing::info!(
        "Loaded {} resources ({} drones) from {}",
        registry.len(),
        registry.drone_ids().len(),
        path
    );
    Ok(registry)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
