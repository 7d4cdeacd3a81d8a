//! Router and fleet read endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use fleet_core::{DroneSnapshot, Resource};

use crate::api::{missions, request_id, route_query};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/resources", get(list_resources))
        .route("/drones", get(list_drones))
        .route("/drones/:drone_id", get(get_drone))
        .route("/mission/start", post(missions::start_mission))
        .route("/mission/stop", post(missions::stop_mission))
        .route("/route", get(route_query::get_route))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

async fn list_resources(State(state): State<Arc<AppState>>) -> Json<Vec<Resource>> {
    Json(state.registry.list_resources())
}

async fn list_drones(State(state): State<Arc<AppState>>) -> Json<Vec<DroneSnapshot>> {
    Json(state.registry.list_drones())
}

async fn get_drone(
    State(state): State<Arc<AppState>>,
    Path(drone_id): Path<String>,
) -> Result<Json<DroneSnapshot>, StatusCode> {
    state
        .registry
        .drone(&drone_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
