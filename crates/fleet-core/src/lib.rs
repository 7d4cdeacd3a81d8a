pub mod battery;
pub mod clearance;
pub mod error;
pub mod geometry;
pub mod models;
pub mod route;
pub mod track;

pub use battery::{BatteryModel, BatteryStep};
pub use clearance::{evaluate, ClearanceEvaluation};
pub use error::{FleetError, FleetResult};
pub use geometry::{
    haversine_distance_km, haversine_distance_m, initial_bearing_deg, line_intersection_point,
    orientation, point_in_polygon, segments_intersect, Orientation,
};
pub use models::{
    ActivationWindow, ActiveMission, ClearanceZone, DroneSnapshot, DroneStatus, DroneView, LatLon,
    LocationUpdate, MissionCommand, Resource, ResourceKind, ResourceLocation, ResourceRecord,
    ResourceStatus, RestrictedZone,
};
pub use route::{
    parse_route_query, plan_route, straight_route, synthesize_waypoints, RoutePlan, RouteParams,
    RoutePoint, RouteResponse, MISSION_ROUTE_STEPS,
};
pub use track::parse_track_csv;
