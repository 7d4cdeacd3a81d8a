//! Battery charge/depletion model.

use serde::{Deserialize, Serialize};

/// Linear battery model shared by the battery task and route planning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryModel {
    /// Seconds a full battery lasts in flight.
    pub life_secs: f64,
    /// Seconds between battery ticks.
    pub tick_secs: f64,
    /// Percentage points gained per tick while at base.
    pub charge_per_tick: f64,
}

/// Result of advancing one battery tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStep {
    pub level: f64,
    /// Battery was already empty away from base; the drone must be sent home.
    pub depleted: bool,
}

impl BatteryModel {
    pub fn new(life_secs: f64, tick_secs: f64, charge_per_tick: f64) -> Self {
        Self {
            life_secs,
            tick_secs,
            charge_per_tick,
        }
    }

    /// Percentage points lost per second of flight.
    pub fn depletion_rate(&self) -> f64 {
        100.0 / self.life_secs
    }

    pub fn step(&self, level: f64, at_base: bool) -> BatteryStep {
        if at_base {
            return BatteryStep {
                level: (level + self.charge_per_tick).min(100.0),
                depleted: false,
            };
        }
        if level <= 0.0 {
            return BatteryStep {
                level: 0.0,
                depleted: true,
            };
        }
        BatteryStep {
            level: (level - self.tick_secs * self.depletion_rate()).max(0.0),
            depleted: false,
        }
    }

    /// Seconds of operation left after flying `travel_secs` from `level`.
    /// Negative when the trip alone would drain the battery.
    pub fn remaining_operation_secs(&self, level: f64, travel_secs: f64) -> f64 {
        let rate = self.depletion_rate();
        (level - travel_secs * rate) / rate
    }
}

impl Default for BatteryModel {
    fn default() -> Self {
        Self::new(30.0 * 60.0, 5.0, 10.0)
    }
}
