use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_core::config::WEBHOOK_URL_KEY;
use relay_core::ForwardError;
use tracing::error;

use crate::api::ErrorBody;

const SINGLE_READ_HINT: &str =
    "Make sure the client sends a single POST and reads the response only once.";

/// Failures the handler cannot recover from locally. Each one becomes a 500.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{key} is not set", key = WEBHOOK_URL_KEY)]
    NotConfigured,
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),
    #[error(transparent)]
    Forward(#[from] ForwardError),
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);

        let hint = match &self {
            GatewayError::NotConfigured => None,
            _ => Some(SINGLE_READ_HINT),
        };
        let body = ErrorBody {
            error: self.to_string(),
            hint,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
