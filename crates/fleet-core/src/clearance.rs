//! Airspace clearance engine.
//!
//! Decides whether a straight route crosses active restricted zones and,
//! for each crossed zone, when the resource enters and leaves it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};
use crate::geometry::{
    haversine_distance_m, line_intersection_point, point_in_polygon, segments_intersect,
};
use crate::models::{ClearanceZone, LatLon, RestrictedZone};

/// Outcome of checking one route against a set of zones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearanceEvaluation {
    pub clearance_required: bool,
    /// Crossed zones in input order.
    pub crossed_zones: Vec<ClearanceZone>,
}

/// Evaluate the straight path `source` → `destination` flown at `speed_mps`
/// starting at `request_time`.
pub fn evaluate(
    source: LatLon,
    destination: LatLon,
    zones: &[RestrictedZone],
    request_time: DateTime<Utc>,
    speed_mps: f64,
) -> FleetResult<ClearanceEvaluation> {
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return Err(FleetError::Validation(format!(
            "transit speed must be positive, got {speed_mps}"
        )));
    }

    let crossed_zones: Vec<ClearanceZone> = zones
        .iter()
        .filter_map(|zone| {
            let (entry, exit) = crossing_points(source, destination, &zone.polygon)?;
            let entry_time = request_time + travel_duration(source, entry, speed_mps);
            let exit_time = request_time + travel_duration(source, exit, speed_mps);

            if zone.active.overlaps(entry_time, exit_time) {
                Some(ClearanceZone {
                    id: zone.id.clone(),
                    entry_time,
                    exit_time,
                })
            } else {
                None
            }
        })
        .collect();

    Ok(ClearanceEvaluation {
        clearance_required: !crossed_zones.is_empty(),
        crossed_zones,
    })
}

/// Entry and exit points of the path through `polygon`, nearest first.
///
/// Edges are walked in order and the first two distinct intersection points
/// are kept. An endpoint inside the polygon stands in for a missing boundary
/// crossing unless it already is one. A path that touches a single boundary
/// point is not a crossing.
fn crossing_points(source: LatLon, destination: LatLon, polygon: &[LatLon]) -> Option<(LatLon, LatLon)> {
    let n = polygon.len();
    if n < 3 {
        return None;
    }

    let mut hits: Vec<LatLon> = Vec::with_capacity(2);
    for i in 0..n {
        let edge_start = polygon[i];
        let edge_end = polygon[(i + 1) % n];
        if !segments_intersect(source, destination, edge_start, edge_end) {
            continue;
        }
        let Some(point) = line_intersection_point(source, destination, edge_start, edge_end) else {
            continue;
        };
        push_distinct(&mut hits, point);
        if hits.len() == 2 {
            break;
        }
    }

    for endpoint in [source, destination] {
        if hits.len() < 2 && point_in_polygon(endpoint, polygon) {
            push_distinct(&mut hits, endpoint);
        }
    }

    match hits.as_slice() {
        [a, b] => {
            if haversine_distance_m(source, *a) <= haversine_distance_m(source, *b) {
                Some((*a, *b))
            } else {
                Some((*b, *a))
            }
        }
        _ => None,
    }
}

fn push_distinct(hits: &mut Vec<LatLon>, point: LatLon) {
    if !hits.iter().any(|hit| same_point(*hit, point)) {
        hits.push(point);
    }
}

fn same_point(a: LatLon, b: LatLon) -> bool {
    const EPS_DEG: f64 = 1e-9;
    (a.lat - b.lat).abs() <= EPS_DEG && (a.lon - b.lon).abs() <= EPS_DEG
}

fn travel_duration(from: LatLon, to: LatLon, speed_mps: f64) -> Duration {
    let secs = haversine_distance_m(from, to) / speed_mps;
    Duration::milliseconds((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivationWindow;
    use chrono::TimeZone;

    const SPEED_MPS: f64 = 30.0;

    fn request_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn zone(id: &str, active: ActivationWindow) -> RestrictedZone {
        RestrictedZone {
            id: id.to_string(),
            polygon: vec![
                LatLon::new(1.30, 103.80),
                LatLon::new(1.30, 103.90),
                LatLon::new(1.40, 103.90),
                LatLon::new(1.40, 103.80),
            ],
            active,
        }
    }

    #[test]
    fn no_zones_means_no_clearance() {
        let result = evaluate(
            LatLon::new(1.30, 103.80),
            LatLon::new(1.31, 103.81),
            &[],
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(!result.clearance_required);
        assert!(result.crossed_zones.is_empty());
    }

    #[test]
    fn path_outside_zone_is_clear() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let result = evaluate(
            LatLon::new(1.20, 103.70),
            LatLon::new(1.25, 103.95),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(!result.clearance_required);
    }

    #[test]
    fn path_inside_always_active_zone_requires_clearance() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let result = evaluate(
            LatLon::new(1.32, 103.82),
            LatLon::new(1.38, 103.88),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(result.clearance_required);
        assert_eq!(result.crossed_zones.len(), 1);
        let crossed = &result.crossed_zones[0];
        assert_eq!(crossed.id, "Z1");
        assert_eq!(crossed.entry_time, request_time());
        assert!(crossed.exit_time > crossed.entry_time);
    }

    #[test]
    fn through_path_gets_entry_and_exit_times() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let source = LatLon::new(1.35, 103.70);
        let destination = LatLon::new(1.35, 104.00);
        let result = evaluate(source, destination, &zones, request_time(), SPEED_MPS).unwrap();

        assert_eq!(result.crossed_zones.len(), 1);
        let crossed = &result.crossed_zones[0];
        let expected_entry =
            haversine_distance_m(source, LatLon::new(1.35, 103.80)) / SPEED_MPS;
        let expected_exit =
            haversine_distance_m(source, LatLon::new(1.35, 103.90)) / SPEED_MPS;
        let entry_secs = (crossed.entry_time - request_time()).num_milliseconds() as f64 / 1000.0;
        let exit_secs = (crossed.exit_time - request_time()).num_milliseconds() as f64 / 1000.0;
        assert!((entry_secs - expected_entry).abs() < 0.01);
        assert!((exit_secs - expected_exit).abs() < 0.01);
    }

    #[test]
    fn reversed_path_still_orders_entry_before_exit() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let result = evaluate(
            LatLon::new(1.35, 104.00),
            LatLon::new(1.35, 103.70),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        let crossed = &result.crossed_zones[0];
        assert!(crossed.entry_time < crossed.exit_time);
    }

    #[test]
    fn expired_zone_is_ignored_even_when_crossed() {
        let from = request_time() - Duration::hours(3);
        let until = request_time() - Duration::hours(2);
        let zones = vec![zone("OLD", ActivationWindow::between(from, until))];
        let result = evaluate(
            LatLon::new(1.35, 103.70),
            LatLon::new(1.35, 104.00),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(!result.clearance_required);
        assert!(result.crossed_zones.is_empty());
    }

    #[test]
    fn grazing_a_single_vertex_is_not_a_crossing() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        // touches the (1.40, 103.90) corner only
        let result = evaluate(
            LatLon::new(1.45, 103.85),
            LatLon::new(1.35, 103.95),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(!result.clearance_required);
    }

    #[test]
    fn zones_reported_in_input_order() {
        let zones = vec![
            zone("SECOND-BY-DISTANCE", ActivationWindow::always()),
            RestrictedZone {
                id: "FIRST-BY-DISTANCE".to_string(),
                polygon: vec![
                    LatLon::new(1.30, 103.72),
                    LatLon::new(1.30, 103.75),
                    LatLon::new(1.40, 103.75),
                    LatLon::new(1.40, 103.72),
                ],
                active: ActivationWindow::always(),
            },
        ];
        let result = evaluate(
            LatLon::new(1.35, 103.70),
            LatLon::new(1.35, 104.00),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        let ids: Vec<&str> = result.crossed_zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["SECOND-BY-DISTANCE", "FIRST-BY-DISTANCE"]);
    }

    fn secs_after_request(time: DateTime<Utc>) -> f64 {
        (time - request_time()).num_milliseconds() as f64 / 1000.0
    }

    fn single_crossing(source: LatLon, destination: LatLon) -> ClearanceZone {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let result = evaluate(source, destination, &zones, request_time(), SPEED_MPS).unwrap();
        assert!(result.clearance_required);
        assert_eq!(result.crossed_zones.len(), 1);
        result.crossed_zones[0].clone()
    }

    #[test]
    fn enters_and_ends_inside() {
        let source = LatLon::new(1.35, 103.70);
        let destination = LatLon::new(1.35, 103.85);
        let crossed = single_crossing(source, destination);

        let entry = haversine_distance_m(source, LatLon::new(1.35, 103.80)) / SPEED_MPS;
        let exit = haversine_distance_m(source, destination) / SPEED_MPS;
        assert!((secs_after_request(crossed.entry_time) - entry).abs() < 0.01);
        assert!((secs_after_request(crossed.exit_time) - exit).abs() < 0.01);
    }

    #[test]
    fn starts_inside_and_exits() {
        let source = LatLon::new(1.35, 103.85);
        let destination = LatLon::new(1.35, 104.00);
        let crossed = single_crossing(source, destination);

        let exit = haversine_distance_m(source, LatLon::new(1.35, 103.90)) / SPEED_MPS;
        assert_eq!(crossed.entry_time, request_time());
        assert!((secs_after_request(crossed.exit_time) - exit).abs() < 0.01);
    }

    #[test]
    fn route_from_boundary_into_zone_requires_clearance() {
        let edge = LatLon::new(1.35, 103.80);
        let deep = LatLon::new(1.35, 103.85);
        let leg = haversine_distance_m(edge, deep) / SPEED_MPS;

        let inbound = single_crossing(edge, deep);
        assert_eq!(inbound.entry_time, request_time());
        assert!((secs_after_request(inbound.exit_time) - leg).abs() < 0.01);

        let outbound = single_crossing(deep, edge);
        assert_eq!(outbound.entry_time, request_time());
        assert!((secs_after_request(outbound.exit_time) - leg).abs() < 0.01);

        // same answer for a start just inside the boundary
        let nudged = single_crossing(LatLon::new(1.35, 103.8000001), deep);
        assert!((secs_after_request(nudged.exit_time) - leg).abs() < 0.05);
    }

    #[test]
    fn route_along_outside_ending_on_boundary_is_clear() {
        let zones = vec![zone("Z1", ActivationWindow::always())];
        let result = evaluate(
            LatLon::new(1.35, 103.70),
            LatLon::new(1.35, 103.80),
            &zones,
            request_time(),
            SPEED_MPS,
        )
        .unwrap();
        assert!(!result.clearance_required);
    }

    #[test]
    fn rejects_non_positive_speed() {
        let err = evaluate(
            LatLon::new(1.30, 103.80),
            LatLon::new(1.31, 103.81),
            &[],
            request_time(),
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, FleetError::Validation(_)));
    }
}
