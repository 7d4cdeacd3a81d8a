//! Route synthesis and route-query planning.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::battery::BatteryModel;
use crate::clearance::{self, ClearanceEvaluation};
use crate::error::{FleetError, FleetResult};
use crate::geometry::haversine_distance_m;
use crate::models::{ClearanceZone, LatLon, RestrictedZone};

/// Steps in the straight route flown by missions and return-to-base.
pub const MISSION_ROUTE_STEPS: usize = 12;

/// A route point with its scheduled time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
}

impl RoutePoint {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

fn lerp(source: LatLon, destination: LatLon, fraction: f64) -> LatLon {
    LatLon::new(
        source.lat + (destination.lat - source.lat) * fraction,
        source.lon + (destination.lon - source.lon) * fraction,
    )
}

/// `count` evenly time-spaced points from `source` to `destination`,
/// interpolating lat and lon independently.
pub fn synthesize_waypoints(
    source: LatLon,
    destination: LatLon,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    count: usize,
) -> FleetResult<Vec<RoutePoint>> {
    if count < 2 {
        return Err(FleetError::Validation(format!(
            "at least 2 waypoints required, got {count}"
        )));
    }

    let last = count - 1;
    let span_ms = (end - start).num_milliseconds() as f64;
    let points = (0..count)
        .map(|i| {
            let position = match i {
                0 => source,
                i if i == last => destination,
                _ => lerp(source, destination, i as f64 / last as f64),
            };
            let offset_ms = (span_ms * i as f64 / last as f64).round() as i64;
            RoutePoint {
                latitude: position.lat,
                longitude: position.lon,
                time: start + Duration::milliseconds(offset_ms),
            }
        })
        .collect();
    Ok(points)
}

/// `steps + 1` equally spaced points, first exactly `source`, last exactly
/// `destination`.
pub fn straight_route(source: LatLon, destination: LatLon, steps: usize) -> Vec<LatLon> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| match i {
            0 => source,
            i if i == steps => destination,
            _ => lerp(source, destination, i as f64 / steps as f64),
        })
        .collect()
}

/// Parse a `"lat,lon:lat,lon"` route query.
pub fn parse_route_query(query: &str) -> FleetResult<(LatLon, LatLon)> {
    let (source, destination) = query
        .split_once(':')
        .ok_or_else(|| FleetError::Validation(format!("query must be 'lat,lon:lat,lon', got '{query}'")))?;
    Ok((parse_point(source)?, parse_point(destination)?))
}

fn parse_point(raw: &str) -> FleetResult<LatLon> {
    let invalid = || FleetError::Validation(format!("invalid coordinate '{raw}'"));
    let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    Some(LatLon::new(lat, lon))
        .filter(LatLon::is_valid)
        .ok_or_else(invalid)
}

/// Tunables for [`plan_route`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteParams {
    pub speed_mps: f64,
    pub dispatch_secs: f64,
    pub clearance_secs: f64,
    pub waypoint_count: usize,
}

/// Everything a route query answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub distance_m: f64,
    pub travel_time_secs: f64,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub clearance: ClearanceEvaluation,
    pub remaining_operation_secs: f64,
    pub waypoints: Vec<RoutePoint>,
}

/// Plan a straight route for a resource currently holding `battery_level`.
///
/// Travel time is flight time at `params.speed_mps` plus dispatch time, plus
/// clearance time when any zone is crossed.
pub fn plan_route(
    source: LatLon,
    destination: LatLon,
    zones: &[RestrictedZone],
    battery_level: f64,
    battery: &BatteryModel,
    params: &RouteParams,
    request_time: DateTime<Utc>,
) -> FleetResult<RoutePlan> {
    let clearance = clearance::evaluate(source, destination, zones, request_time, params.speed_mps)?;

    let distance_m = haversine_distance_m(source, destination);
    let mut travel_time_secs = distance_m / params.speed_mps + params.dispatch_secs;
    if clearance.clearance_required {
        travel_time_secs += params.clearance_secs;
    }

    let departure = request_time;
    let arrival = departure + Duration::milliseconds((travel_time_secs * 1000.0).round() as i64);
    let waypoints =
        synthesize_waypoints(source, destination, departure, arrival, params.waypoint_count)?;

    Ok(RoutePlan {
        distance_m,
        travel_time_secs,
        departure,
        arrival,
        remaining_operation_secs: battery.remaining_operation_secs(battery_level, travel_time_secs),
        clearance,
        waypoints,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub summary: RouteSummary,
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub summary: RouteSummary,
    pub points: Vec<RoutePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub length_in_meters: i64,
    pub travel_time_in_seconds: i64,
    pub traffic_delay_in_seconds: i64,
    pub traffic_length_in_meters: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub clearance_required: bool,
    #[serde(rename = "remainingOperationTimeAtLocationInSeconds")]
    pub remaining_operation_time_at_location: i64,
    pub clearance_zones: Vec<ClearanceZone>,
}

impl From<RoutePlan> for RouteResponse {
    fn from(plan: RoutePlan) -> Self {
        let summary = RouteSummary {
            length_in_meters: plan.distance_m as i64,
            travel_time_in_seconds: plan.travel_time_secs as i64,
            traffic_delay_in_seconds: 0,
            traffic_length_in_meters: 0,
            departure_time: plan.departure,
            arrival_time: plan.arrival,
            clearance_required: plan.clearance.clearance_required,
            remaining_operation_time_at_location: plan.remaining_operation_secs as i64,
            clearance_zones: plan.clearance.crossed_zones,
        };
        RouteResponse {
            routes: vec![Route {
                summary: summary.clone(),
                legs: vec![Leg {
                    summary,
                    points: plan.waypoints,
                }],
            }],
        }
    }
}
