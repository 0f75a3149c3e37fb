//! Mock upstream providers for integration tests
//!
//! One server answers both the chat completions endpoint and the
//! text-to-speech endpoint, counting every request it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Reply text the default mock model returns
pub const MOCK_REPLY: &str = "Hello from the mocked model";

/// How the mock chat endpoint answers
#[derive(Debug, Clone)]
pub enum LlmBehavior {
    /// OpenAI-style `choices[0].message.content`
    Reply(String),
    /// Legacy `[{"generated_text": ...}]`
    Legacy(String),
    /// Valid JSON without any reply field
    Malformed,
    /// Error status with a short body
    Status(u16),
}

/// How the mock speech endpoint answers
#[derive(Debug, Clone)]
pub enum TtsBehavior {
    Audio(Vec<u8>),
    Status(u16),
    /// Announces a long body, sends a few bytes, then drops the connection
    Truncated,
}

/// Request details the mock recorded
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub llm_authorization: Option<String>,
    pub llm_prompt: Option<String>,
    pub llm_model: Option<String>,
    pub tts_api_key: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_text: Option<String>,
    pub tts_output_format: Option<String>,
}

pub struct MockProviders {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    llm_count: AtomicU32,
    tts_count: AtomicU32,
    llm: LlmBehavior,
    tts: TtsBehavior,
    recorded: Mutex<Recorded>,
}

/// Fake MP3 payload, large enough to arrive in several chunks
pub fn mock_audio() -> Vec<u8> {
    let mut audio = b"ID3".to_vec();
    audio.extend((0..256 * 1024).map(|i| (i % 251) as u8));
    audio
}

impl MockProviders {
    /// Mock that answers both endpoints successfully
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(
            LlmBehavior::Reply(MOCK_REPLY.to_owned()),
            TtsBehavior::Audio(mock_audio()),
        )
        .await
    }

    pub async fn start_with(llm: LlmBehavior, tts: TtsBehavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            llm_count: AtomicU32::new(0),
            tts_count: AtomicU32::new(0),
            llm,
            tts,
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .route("/v1/text-to-speech/:voice_id", routing::post(handle_text_to_speech))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for both providers, including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn llm_count(&self) -> u32 {
        self.state.llm_count.load(Ordering::SeqCst)
    }

    pub fn tts_count(&self) -> u32 {
        self.state.tts_count.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Recorded {
        self.state.recorded.lock().unwrap().clone()
    }
}

impl Drop for MockProviders {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[allow(dead_code)]
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct TextToSpeechRequest {
    text: String,
    #[allow(dead_code)]
    model_id: String,
}

#[derive(Debug, Deserialize)]
struct TextToSpeechQuery {
    output_format: Option<String>,
}

async fn handle_chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    state.llm_count.fetch_add(1, Ordering::SeqCst);
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.llm_authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        recorded.llm_prompt = request.messages.last().map(|m| m.content.clone());
        recorded.llm_model = Some(request.model.clone());
    }

    match &state.llm {
        LlmBehavior::Reply(content) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "created": 0,
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        LlmBehavior::Legacy(text) => Json(json!([{ "generated_text": text }])).into_response(),
        LlmBehavior::Malformed => Json(json!({ "warnings": ["model is loading"] })).into_response(),
        LlmBehavior::Status(code) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "mock model failure",
        )
            .into_response(),
    }
}

async fn handle_text_to_speech(
    State(state): State<Arc<MockState>>,
    Path(voice_id): Path<String>,
    axum::extract::Query(query): axum::extract::Query<TextToSpeechQuery>,
    headers: HeaderMap,
    Json(request): Json<TextToSpeechRequest>,
) -> Response {
    state.tts_count.fetch_add(1, Ordering::SeqCst);
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.tts_api_key = headers
            .get("xi-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        recorded.tts_voice = Some(voice_id);
        recorded.tts_text = Some(request.text);
        recorded.tts_output_format = query.output_format;
    }

    match &state.tts {
        TtsBehavior::Audio(bytes) => (
            [(header::CONTENT_TYPE, "audio/mpeg")],
            Body::from(bytes.clone()),
        )
            .into_response(),
        TtsBehavior::Status(code) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({"detail": {"status": "mock_failure"}})),
        )
            .into_response(),
        TtsBehavior::Truncated => {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"ID3partial")),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "mock connection dropped",
                )),
            ];
            (
                [
                    (header::CONTENT_TYPE, "audio/mpeg"),
                    (header::CONTENT_LENGTH, "100000"),
                ],
                Body::from_stream(futures::stream::iter(chunks)),
            )
                .into_response()
        }
    }
}
