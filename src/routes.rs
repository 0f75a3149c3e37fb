use std::any::Any;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline::{SynthesisResult, Utterance};
use crate::state::AppState;
use crate::tts::AUDIO_ROUTE;

/// Inbound body for the voice endpoints
#[derive(Debug, Deserialize)]
pub struct GenerateAudioRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Accepted for client compatibility, only recorded in logs
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Full application: routes, static audio, and middleware.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes(state.clone()))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn create_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/api/health", get(health_check))
        // Both paths were used by earlier clients
        .route("/generate_audio", post(generate_audio))
        .route("/alexa", post(generate_audio))
        .nest_service(AUDIO_ROUTE, ServeDir::new(state.audio_store.dir()))
        .layer(middleware::from_fn(hide_partial_audio))
}

/// Files still being written live under dot-prefixed names; never serve them.
async fn hide_partial_audio(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let hidden = path
        .strip_prefix(AUDIO_ROUTE)
        .map(|rest| {
            rest.split('/').any(|segment| {
                segment.starts_with('.')
                    || segment.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("%2e"))
            })
        })
        .unwrap_or(false);

    if hidden {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "AI Voice Backend Active" }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llm_configured": state.config.llm_config.api_key.is_some(),
        "tts_configured": state.config.tts_config.api_key.is_some(),
    }))
}

async fn generate_audio(
    State(state): State<AppState>,
    payload: Result<Json<GenerateAudioRequest>, JsonRejection>,
) -> Result<Json<SynthesisResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let utterance = request
        .text
        .as_deref()
        .and_then(Utterance::parse)
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;

    let span = info_span!(
        "voice_request",
        request_id = %Uuid::new_v4(),
        user_id = request.user_id.as_deref().unwrap_or("-"),
    );
    span.in_scope(|| info!("User said: {}", utterance.as_str()));

    // Detached so the pipeline finishes even if the caller disconnects
    let pipeline = state.pipeline.clone();
    let result = tokio::spawn(async move { pipeline.run(&utterance).await }.instrument(span))
        .await
        .map_err(|e| anyhow::Error::new(e).context("Voice pipeline task failed"))?;

    Ok(Json(result))
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal(anyhow::anyhow!("Internal server error")).into_response()
}
