//! Background tasks driving the simulated fleet.

pub mod battery_loop;
pub mod location_loop;
pub mod mission_loop;
pub mod patrol_loop;
