use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of the response generator.
///
/// The display strings are what a caller sees in `response_text` when
/// generation fails, so they read as complete sentences.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Error: Missing HuggingFace API Key.")]
    MissingApiKey,

    #[error("Error: HuggingFace request failed: {0}")]
    Request(String),

    #[error("Error: Unexpected response format from HuggingFace API.")]
    UnexpectedFormat,
}

/// Failures of the speech synthesizer.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Error: Missing ElevenLabs API Key.")]
    MissingApiKey,

    #[error("Error: ElevenLabs request failed: {0}")]
    Request(String),

    #[error("Error: Failed to store audio: {0}")]
    Storage(String),
}

impl From<std::io::Error> for TtsError {
    fn from(e: std::io::Error) -> Self {
        TtsError::Storage(e.to_string())
    }
}

/// Errors surfaced to HTTP callers as a JSON `{"error": ...}` body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
