//! HTTP-facing error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roadie_core::RoadieError;
use serde_json::json;

/// Wraps coordinator errors so handlers can use `?`. The body shape is
/// always `{"error": message}`.
pub struct ApiError(pub RoadieError);

impl From<RoadieError> for ApiError {
    fn from(e: RoadieError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RoadieError::Validation(_) => StatusCode::BAD_REQUEST,
            RoadieError::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "User is not logged in" })),
    )
        .into_response()
}
