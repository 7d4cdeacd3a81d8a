//! HTTP API for the fleet emulator.

pub mod error;
pub mod missions;
pub mod request_id;
pub mod route_query;
mod routes;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub use error::ApiError;

pub fn routes() -> Router<Arc<AppState>> {
    routes::create_router()
}
