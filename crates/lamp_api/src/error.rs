use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::Error;
use serde_json::json;
use tracing::error;

/// Error returned from HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UnknownDevice(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
