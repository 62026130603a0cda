use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::constants;

/// Failures surfaced by the generation gateway.
///
/// The `Display` text is exactly what clients see in `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{} is not configured", constants::API_TOKEN_ENV)]
    Configuration,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Generation(String),

    #[error("Replicate API request failed with status {status}: {detail}")]
    Provider { status: u16, detail: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn prompt_required() -> Self {
        GatewayError::Validation("Prompt is required".to_string())
    }

    pub fn generation_failed() -> Self {
        GatewayError::Generation("Image generation failed".to_string())
    }

    pub fn missing_output() -> Self {
        GatewayError::Generation("No image URL in the response".to_string())
    }

    pub fn timed_out(after: Duration) -> Self {
        GatewayError::Generation(format!(
            "Image generation timed out after {} seconds",
            after.as_secs_f64()
        ))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Configuration
            | GatewayError::Generation(_)
            | GatewayError::Provider { .. }
            | GatewayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
