//! Route query endpoint: distance, timing and airspace clearance for a
//! straight route.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use fleet_core::{parse_route_query, plan_route, FleetError, RouteResponse};

use crate::api::ApiError;
use crate::state::AppState;

/// Raw query string. Every field is mandatory even though only `query`
/// and `resourceId` shape the answer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQueryParams {
    pub query: Option<String>,
    pub resource_id: Option<String>,
    pub route_type: Option<String>,
    pub travel_mode: Option<String>,
    pub compute_best_order: Option<String>,
    pub route_representation: Option<String>,
}

impl RouteQueryParams {
    /// Names of missing or blank parameters.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("query", &self.query),
            ("resourceId", &self.resource_id),
            ("routeType", &self.route_type),
            ("travelMode", &self.travel_mode),
            ("computeBestOrder", &self.compute_best_order),
            ("routeRepresentation", &self.route_representation),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RouteQueryParams>,
) -> Result<Json<RouteResponse>, ApiError> {
    let missing = params.missing();
    if !missing.is_empty() {
        return Err(FleetError::Validation(format!("missing parameters: {}", missing.join(", "))).into());
    }
    let query = params.query.as_deref().unwrap_or_default();
    let resource_id = params.resource_id.as_deref().unwrap_or_default().trim();

    let (source, destination) = parse_route_query(query)?;
    if !state.registry.contains(resource_id) {
        return Err(FleetError::NotFound(resource_id.to_string()).into());
    }
    // resources without a battery never run out
    let battery_level = state.registry.battery(resource_id).unwrap_or(100.0);

    let zones = state
        .zones
        .load_zones()
        .await
        .map_err(|e| FleetError::Upstream(format!("{:#}", e)))?;

    let config = state.config();
    let plan = plan_route(
        source,
        destination,
        &zones,
        battery_level,
        &config.battery_model(),
        &config.route_params(),
        Utc::now(),
    )?;

    tracing::info!(
        "Route for {}: {:.0} m, {:.0} s, clearance required: {} ({} zones)",
        resource_id,
        plan.distance_m,
        plan.travel_time_secs,
        plan.clearance.clearance_required,
        plan.clearance.crossed_zones.len()
    );
    Ok(Json(plan.into()))
}
