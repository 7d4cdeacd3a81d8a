//! Mapping of fleet errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use fleet_core::FleetError;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub FleetError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            FleetError::Validation(_) | FleetError::NotFound(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            FleetError::Conflict(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "resource not available".to_string(),
            ),
            FleetError::Upstream(detail) => {
                tracing::error!("Upstream failure: {}", detail);
                (StatusCode::BAD_GATEWAY, "upstream service unavailable".to_string())
            }
            FleetError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let status = |err: FleetError| ApiError(err).into_response().status();
        assert_eq!(status(FleetError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(FleetError::NotFound("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(FleetError::Conflict("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(FleetError::Upstream("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(FleetError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
