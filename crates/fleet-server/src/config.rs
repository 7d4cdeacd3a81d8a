//! Server configuration from environment.

use std::env;
use std::time::Duration;

use fleet_core::{BatteryModel, RouteParams};

/// Meters per second in one mile per hour.
const MPH_TO_MPS: f64 = 0.44704;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub drone_speed_mph: f64,
    pub drone_altitude_ft: f64,
    pub drone_temperature_c: f64,
    pub drone_signal_strength: String,
    pub battery_life_min: f64,
    pub battery_charge_per_tick: f64,
    pub dispatch_time_s: f64,
    pub clearance_time_s: f64,
    pub route_waypoints: usize,
    pub patrol_interval_s: u64,
    pub mission_tick_s: u64,
    pub battery_tick_s: u64,
    pub shutdown_timeout_s: u64,
    pub resources_file: Option<String>,
    pub tracks_dir: Option<String>,
    pub no_fly_zones_url: Option<String>,
    pub connector_url: Option<String>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or unparsable keys fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());
        let parsed_u64 = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let non_empty = |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Self {
            server_port: lookup("FLEET_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(11000),
            drone_speed_mph: parsed("DRONE_SPEED_MPH").filter(|v| *v > 0.0).unwrap_or(67.0),
            drone_altitude_ft: parsed("DRONE_ALTITUDE_FT").unwrap_or(400.0),
            drone_temperature_c: parsed("DRONE_TEMPERATURE_C").unwrap_or(31.0),
            drone_signal_strength: non_empty("DRONE_SIGNAL_STRENGTH")
                .unwrap_or_else(|| "Excellent".to_string()),
            battery_life_min: parsed("BATTERY_LIFE_MIN").filter(|v| *v > 0.0).unwrap_or(30.0),
            battery_charge_per_tick: parsed("BATTERY_CHARGE_PER_TICK").unwrap_or(10.0),
            dispatch_time_s: parsed("DISPATCH_TIME_S").unwrap_or(60.0),
            clearance_time_s: parsed("CLEARANCE_TIME_S").unwrap_or(300.0),
            route_waypoints: lookup("ROUTE_WAYPOINTS")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n >= 2)
                .unwrap_or(10),
            patrol_interval_s: parsed_u64("PATROL_INTERVAL_S").filter(|v| *v > 0).unwrap_or(20),
            mission_tick_s: parsed_u64("MISSION_TICK_S").filter(|v| *v > 0).unwrap_or(5),
            battery_tick_s: parsed_u64("BATTERY_TICK_S").filter(|v| *v > 0).unwrap_or(5),
            shutdown_timeout_s: parsed_u64("SHUTDOWN_TIMEOUT_S").unwrap_or(5),
            resources_file: non_empty("RESOURCES_FILE"),
            tracks_dir: non_empty("TRACKS_DIR"),
            no_fly_zones_url: non_empty("NO_FLY_ZONES_URL"),
            connector_url: non_empty("CONNECTOR_URL"),
            log_json: lookup("LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn drone_speed_mps(&self) -> f64 {
        self.drone_speed_mph * MPH_TO_MPS
    }

    pub fn battery_model(&self) -> BatteryModel {
        BatteryModel::new(
            self.battery_life_min * 60.0,
            self.battery_tick_s as f64,
            self.battery_charge_per_tick,
        )
    }

    pub fn route_params(&self) -> RouteParams {
        RouteParams {
            speed_mps: self.drone_speed_mps(),
            dispatch_secs: self.dispatch_time_s,
            clearance_secs: self.clearance_time_s,
            waypoint_count: self.route_waypoints,
        }
    }

    pub fn simulation_settings(&self) -> SimulationSettings {
        let mission_tick = Duration::from_secs(self.mission_tick_s);
        SimulationSettings {
            patrol_interval: Duration::from_secs(self.patrol_interval_s),
            mission_tick,
            battery_tick: Duration::from_secs(self.battery_tick_s),
            battery: self.battery_model(),
            cruise_speed_mph: self.drone_speed_mph,
            cruise_altitude_ft: self.drone_altitude_ft,
            signal_strength: self.drone_signal_strength.clone(),
            temperature_c: self.drone_temperature_c,
            // a running task notices a signal within one tick
            command_wait: mission_tick * 2,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_s),
        }
    }
}

/// Timing and drone parameters handed to the simulation tasks.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub patrol_interval: Duration,
    pub mission_tick: Duration,
    pub battery_tick: Duration,
    pub battery: BatteryModel,
    pub cruise_speed_mph: f64,
    pub cruise_altitude_ft: f64,
    pub signal_strength: String,
    pub temperature_c: f64,
    /// How long a command sender waits for the running task to take it.
    pub command_wait: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Config::from_lookup(|_| None).simulation_settings()
    }
}
