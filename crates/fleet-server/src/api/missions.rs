//! Mission start/stop endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use fleet_core::{FleetError, MissionCommand};

use crate::api::ApiError;
use crate::state::AppState;

fn command_body(
    payload: Result<Json<MissionCommand>, JsonRejection>,
) -> Result<MissionCommand, ApiError> {
    payload
        .map(|Json(command)| command)
        .map_err(|rejection| ApiError(FleetError::Validation(rejection.body_text())))
}

pub async fn start_mission(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MissionCommand>, JsonRejection>,
) -> Result<Json<MissionCommand>, ApiError> {
    let command = command_body(payload)?;
    state.simulator.start_mission(&command).map_err(|err| {
        tracing::warn!("Mission start for {} rejected: {}", command.resource_id, err);
        err
    })?;
    Ok(Json(command))
}

pub async fn stop_mission(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MissionCommand>, JsonRejection>,
) -> Result<Json<MissionCommand>, ApiError> {
    let command = command_body(payload)?;
    state.simulator.stop_mission(&command)?;
    tracing::info!("Mission stop requested for {}", command.resource_id);
    Ok(Json(command))
}
