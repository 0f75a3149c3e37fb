use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::interface::ResponseGenerator;
use crate::config::LLMConfig;
use crate::error::LlmError;

/// Conversational model hosted behind the HuggingFace inference router.
///
/// Speaks the OpenAI-compatible chat completions protocol, and also accepts
/// the `generated_text` shape returned by the older text-generation API.
pub struct HuggingFaceLLM {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl HuggingFaceLLM {
    pub fn new(config: &LLMConfig, client: Client) -> Self {
        info!(
            "Initialized HuggingFaceLLM: model={}, base_url={}, credential={}",
            config.model,
            config.base_url,
            if config.api_key.is_some() { "set" } else { "missing" }
        );
        Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl ResponseGenerator for HuggingFaceLLM {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let Some(api_key) = &self.api_key else {
            warn!("HuggingFace API key is not configured, skipping generation");
            return Err(LlmError::MissingApiKey);
        };

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!("HuggingFace request: model={}, prompt_len={}", self.model, prompt.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("HuggingFace request failed: {}", e);
                LlmError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("HuggingFace API error ({}): {}", status, error_text);
            return Err(LlmError::Request(format!("HTTP {}: {}", status, error_text)));
        }

        let value: Value = response.json().await.map_err(|e| {
            warn!("HuggingFace response is not valid JSON: {}", e);
            LlmError::UnexpectedFormat
        })?;

        let reply = extract_reply(&value).ok_or_else(|| {
            warn!("Unexpected HuggingFace response shape: {}", value);
            LlmError::UnexpectedFormat
        })?;

        debug!("HuggingFace reply received, {} chars", reply.len());
        Ok(reply)
    }
}

/// Pull the reply text out of a completion response.
///
/// Accepts `choices[0].message.content` first, then `[{"generated_text"}]`
/// and `{"generated_text"}`. Blank replies are rejected.
fn extract_reply(value: &Value) -> Option<String> {
    let text = value
        .pointer("/choices/0/message/content")
        .or_else(|| match value {
            Value::Array(items) => items.first().and_then(|item| item.get("generated_text")),
            Value::Object(_) => value.get("generated_text"),
            _ => None,
        })
        .and_then(Value::as_str)?
        .trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
