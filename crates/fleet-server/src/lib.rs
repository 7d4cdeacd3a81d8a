//! Fleet emulator server: simulated resources, mission control and
//! airspace-checked route queries.

pub mod api;
pub mod config;
pub mod loops;
pub mod publisher;
pub mod simulator;
pub mod sources;
pub mod state;
