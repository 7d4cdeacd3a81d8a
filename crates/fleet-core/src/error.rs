//! Error taxonomy shared by the simulation and the API layer.

use thiserror::Error;

/// Failures surfaced by fleet operations.
///
/// None of these are retried inside the emulator; callers decide whether a
/// request is worth repeating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    /// Missing or malformed request parameter or command field.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Unknown resource id.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// Resource is busy with another mission.
    #[error("{0} is not available")]
    Conflict(String),
    /// An external collaborator (zone store, publisher) could not be reached.
    #[error("upstream failure: {0}")]
    Upstream(String),
    /// Serialization failure or violated invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type FleetResult<T> = Result<T, FleetError>;
